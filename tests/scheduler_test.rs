//! Execution scheduler tests against a mock render worker.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use common::{minutes_from_now, TestHarness};
use playout::config::Config;
use playout::scheduler::JobState;
use playout_common::EntryId;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn wait_for_state(h: &TestHarness, id: EntryId, state: JobState) {
    for _ in 0..50 {
        if h.ctx.scheduler.job_state(id) == Some(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!(
        "entry {} never reached {:?}, last state {:?}",
        id,
        state,
        h.ctx.scheduler.job_state(id)
    );
}

fn entry_id(body: &serde_json::Value) -> EntryId {
    EntryId::from(body["id"].as_i64().unwrap())
}

#[tokio::test]
async fn test_reload_takes_only_the_lookahead_window() {
    let mut config = Config::default();
    config.scheduler.queue_size = 3;
    let h = TestHarness::with_config(config).await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    let mut ids = Vec::new();
    for slot in 0..5 {
        let (status, body) = h
            .request(
                "POST",
                "/api/schedule",
                Some(json!({
                    "channel_id": "news",
                    "programme_id": programme,
                    "scheduled_start": minutes_from_now(10 + slot * 30),
                    "scheduled_end": minutes_from_now(40 + slot * 30),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(entry_id(&body));
    }

    let jobs = h.ctx.scheduler.jobs();
    let registered: Vec<EntryId> = jobs.iter().map(|j| j.entry_id).collect();
    assert_eq!(registered, ids[..3].to_vec());

    // Nothing changed, so a second reload is a no-op.
    let (status, summary) = h.request("POST", "/api/scheduler/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["added"], 0);
    assert_eq!(summary["dropped"], 0);
}

#[tokio::test]
async fn test_due_entry_is_played_into_channel_ingest() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h
        .add_programme("Bulletin", &["https://vod/a.mp4", "https://vod/b.mp4"])
        .id
        .get();

    Mock::given(method("POST"))
        .and(path("/task/play"))
        .and(body_partial_json(json!({
            "encodeArgs": { "dstURL": "rtmp://ingest/news" },
            "videos": ["https://vod/a.mp4", "https://vod/b.mp4"],
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.vt)
        .await;

    let shutdown = CancellationToken::new();
    let runner = {
        let scheduler = h.ctx.scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    let start = Utc::now() + chrono::Duration::milliseconds(800);
    let (status, body) = h
        .request(
            "POST",
            "/api/schedule",
            Some(json!({
                "channel_id": "news",
                "programme_id": programme,
                "scheduled_start": start,
                "scheduled_end": start + chrono::Duration::minutes(30),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = entry_id(&body);

    wait_for_state(&h, id, JobState::Completed).await;

    let (_, entry) = h
        .request("GET", &format!("/api/schedule/{}", id), None)
        .await;
    assert!(entry["broadcast_start"].is_string());

    shutdown.cancel();
    runner.await.unwrap();
}

#[tokio::test]
async fn test_render_worker_rejection_fails_the_job() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    Mock::given(method("POST"))
        .and(path("/task/play"))
        .respond_with(ResponseTemplate::new(500).set_body_string("encoder busy"))
        .expect(1)
        .mount(&h.vt)
        .await;

    let shutdown = CancellationToken::new();
    let runner = {
        let scheduler = h.ctx.scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    let start = Utc::now() + chrono::Duration::milliseconds(800);
    let (_, body) = h
        .request(
            "POST",
            "/api/schedule",
            Some(json!({
                "channel_id": "news",
                "programme_id": programme,
                "scheduled_start": start,
                "scheduled_end": start + chrono::Duration::minutes(30),
            })),
        )
        .await;
    let id = entry_id(&body);

    wait_for_state(&h, id, JobState::Failed).await;
    let job = h
        .ctx
        .scheduler
        .jobs()
        .into_iter()
        .find(|j| j.entry_id == id)
        .unwrap();
    assert!(job.error.unwrap().contains("encoder busy"));

    shutdown.cancel();
    runner.await.unwrap();
}

#[tokio::test]
async fn test_deleted_entry_is_never_played() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Bulletin", &["https://vod/a.mp4"]).id.get();

    Mock::given(method("POST"))
        .and(path("/task/play"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.vt)
        .await;

    let shutdown = CancellationToken::new();
    let runner = {
        let scheduler = h.ctx.scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    let start = Utc::now() + chrono::Duration::milliseconds(600);
    let (_, body) = h
        .request(
            "POST",
            "/api/schedule",
            Some(json!({
                "channel_id": "news",
                "programme_id": programme,
                "scheduled_start": start,
                "scheduled_end": start + chrono::Duration::minutes(30),
            })),
        )
        .await;
    let id = entry_id(&body);

    let (status, _) = h
        .request("DELETE", &format!("/api/schedule/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(h.ctx.scheduler.job_state(id), Some(JobState::Cancelled));

    shutdown.cancel();
    runner.await.unwrap();
}

#[tokio::test]
async fn test_live_programme_is_marked_without_dispatch() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;
    let programme = h.add_programme("Live show", &[]).id.get();

    Mock::given(method("POST"))
        .and(path("/task/play"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.vt)
        .await;

    let shutdown = CancellationToken::new();
    let runner = {
        let scheduler = h.ctx.scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    let start = Utc::now() + chrono::Duration::milliseconds(600);
    let (_, body) = h
        .request(
            "POST",
            "/api/schedule",
            Some(json!({
                "channel_id": "news",
                "programme_id": programme,
                "scheduled_start": start,
                "scheduled_end": start + chrono::Duration::minutes(30),
            })),
        )
        .await;
    let id = entry_id(&body);

    wait_for_state(&h, id, JobState::Completed).await;

    shutdown.cancel();
    runner.await.unwrap();
}
