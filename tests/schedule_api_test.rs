//! Schedule API tests through the full router.

mod common;

use axum::http::StatusCode;
use common::{minutes_from_now, TestHarness};
use playout::scheduler::JobState;
use playout_common::EntryId;
use serde_json::json;

async fn schedule(
    h: &TestHarness,
    programme: i64,
    start: i64,
    end: i64,
) -> (StatusCode, serde_json::Value) {
    h.request(
        "POST",
        "/api/schedule",
        Some(json!({
            "channel_id": "news",
            "programme_id": programme,
            "scheduled_start": minutes_from_now(start),
            "scheduled_end": minutes_from_now(end),
        })),
    )
    .await
}

#[tokio::test]
async fn test_create_entry_defaults_ingest_to_channel() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]);

    let (status, body) = schedule(&h, programme.id.get(), 10, 40).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["channel_id"], "news");
    assert_eq!(body["ingest_url"], "rtmp://ingest/news");
    assert_eq!(body["ingest_type"], "rtmp");
    assert!(body["broadcast_start"].is_null());

    let (status, fetched) = h
        .request("GET", &format!("/api/schedule/{}", body["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], body["id"]);
}

#[tokio::test]
async fn test_overlap_is_rejected_with_conflicting_entry() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let (_, first) = schedule(&h, programme, 10, 40).await;

    let (status, body) = schedule(&h, programme, 30, 50).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "schedule_conflict");
    assert_eq!(body["entry_id"], first["id"]);

    // Contained entirely inside the first entry.
    let (status, _) = schedule(&h, programme, 15, 20).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_adjacent_entries_do_not_overlap() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let (status, _) = schedule(&h, programme, 10, 40).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = schedule(&h, programme, 40, 70).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = schedule(&h, programme, 0, 10).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_entries_are_rejected() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    // End before start.
    let (status, body) = schedule(&h, programme, 40, 10).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    // Unknown programme.
    let (status, _) = schedule(&h, 9999, 10, 40).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unknown channel.
    let (status, _) = h
        .request(
            "POST",
            "/api/schedule",
            Some(json!({
                "channel_id": "sport",
                "programme_id": programme,
                "scheduled_start": minutes_from_now(10),
                "scheduled_end": minutes_from_now(40),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_registers_scheduler_job() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let (_, entry) = schedule(&h, programme, 10, 40).await;

    let (status, jobs) = h.request("GET", "/api/scheduler/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["entry_id"], entry["id"]);
    assert_eq!(jobs[0]["state"], "pending");
}

#[tokio::test]
async fn test_update_into_overlap_is_rejected() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let (_, first) = schedule(&h, programme, 10, 40).await;
    let (_, second) = schedule(&h, programme, 60, 90).await;

    let uri = format!("/api/schedule/{}", second["id"]);
    let (status, body) = h
        .request(
            "PATCH",
            &uri,
            Some(json!({ "scheduled_start": minutes_from_now(30) })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["entry_id"], first["id"]);

    // Moving within its own slot never collides with itself.
    let (status, body) = h
        .request(
            "PATCH",
            &uri,
            Some(json!({ "scheduled_start": minutes_from_now(50) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheduled_end"], second["scheduled_end"]);
}

#[tokio::test]
async fn test_health_reports_islands_and_gaps() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let (status, health) = h.request("GET", "/api/channels/news/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["unscheduled"], true);

    schedule(&h, programme, 10, 40).await;
    schedule(&h, programme, 40, 70).await;
    schedule(&h, programme, 100, 130).await;

    let (_, health) = h.request("GET", "/api/channels/news/health", None).await;
    assert_eq!(health["unscheduled"], false);
    let islands = health["islands"].as_array().unwrap();
    assert_eq!(islands.len(), 2);
    assert_eq!(islands[0]["entries"].as_array().unwrap().len(), 2);
    let gaps = health["gaps"].as_array().unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0]["seconds"], 30 * 60);
}

#[tokio::test]
async fn test_channel_schedule_range() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    schedule(&h, programme, 10, 40).await;
    schedule(&h, programme, 100, 130).await;

    let (status, all) = h.request("GET", "/api/channels/news/schedule", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let from = minutes_from_now(0).to_rfc3339().replace('+', "%2B");
    let to = minutes_from_now(60).to_rfc3339().replace('+', "%2B");
    let (status, ranged) = h
        .request(
            "GET",
            &format!("/api/channels/news/schedule?from={}&to={}", from, to),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ranged.as_array().unwrap().len(), 1);

    let (status, _) = h
        .request("GET", &format!("/api/channels/news/schedule?from={}", from), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_entry() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let (_, entry) = schedule(&h, programme, 10, 40).await;
    let uri = format!("/api/schedule/{}", entry["id"]);

    let (status, _) = h.request("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let id = EntryId::from(entry["id"].as_i64().unwrap());
    assert_eq!(h.ctx.scheduler.job_state(id), Some(JobState::Cancelled));

    let (status, body) = h.request("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    // The slot is free again.
    let (status, _) = schedule(&h, programme, 10, 40).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_scheduled_programme_cannot_be_deleted() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();
    schedule(&h, programme, 10, 40).await;

    let (status, _) = h
        .request("DELETE", &format!("/api/programmes/{}", programme), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = h
        .request("GET", &format!("/api/programmes/{}", programme), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_programme_over_http() {
    let h = TestHarness::new().await;

    let (status, body) = h
        .request(
            "POST",
            "/api/programmes",
            Some(json!({ "title": "Live show", "videos": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Live show");

    let (status, list) = h.request("GET", "/api/programmes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}
