//! Channel lifecycle, public listing and plan preview over HTTP.

mod common;

use axum::http::StatusCode;
use common::{hls_output, output, TestHarness};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_provision_over_http() {
    let h = TestHarness::new().await;

    let (status, channel) = h
        .request(
            "POST",
            "/api/channels",
            Some(json!({
                "short_name": "news",
                "ingest": { "url": "rtmp://ingest/news", "protocol": "rtmp" },
                "outputs": [hls_output("web")],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(channel["short_name"], "news");
    assert_eq!(channel["status"], "pending");
    assert_eq!(channel["visibility"], "public");

    let (status, _) = h
        .request(
            "POST",
            "/api/channels",
            Some(json!({
                "short_name": "news",
                "ingest": { "url": "rtmp://ingest/other", "protocol": "rtmp" },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = h.request("GET", "/api/channels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_provision_generates_short_name() {
    let h = TestHarness::new().await;

    let (status, channel) = h
        .request(
            "POST",
            "/api/channels",
            Some(json!({
                "ingest": { "url": "rtmp://ingest/x", "protocol": "rtmp" },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let short_name = channel["short_name"].as_str().unwrap();
    assert!(!short_name.is_empty());
    assert!(short_name.chars().all(|c| c.is_ascii_lowercase()));

    let (status, _) = h
        .request("GET", &format!("/api/channels/{}", short_name), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_start_submits_one_task_per_planned_output() {
    let h = TestHarness::new().await;
    h.provision(
        "news",
        vec![hls_output("web"), output("youtube", "rtmp"), output("dash", "dash")],
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/new_live"))
        .and(body_partial_json(json!({ "srcURL": "rtmp://ingest/news" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&h.vt)
        .await;

    let (status, report) = h.request("POST", "/api/channels/news/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "running");

    let outputs = report["outputs"].as_array().unwrap();
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0]["started"], true);
    assert_eq!(outputs[1]["started"], true);
    assert_eq!(outputs[2]["started"], false);
    assert!(outputs[2]["error"].as_str().unwrap().contains("dash"));

    // Already running.
    let (status, body) = h.request("POST", "/api/channels/news/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, body) = h.request("POST", "/api/channels/news/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn test_start_falls_back_to_pending_when_worker_is_down() {
    let h = TestHarness::new().await;
    h.provision("news", vec![output("youtube", "rtmp")]).await;

    Mock::given(method("POST"))
        .and(path("/new_live"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.vt)
        .await;

    let (status, report) = h.request("POST", "/api/channels/news/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "pending");
    assert_eq!(report["outputs"][0]["started"], false);
}

#[tokio::test]
async fn test_update_outputs_and_plans() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;

    let (status, channel) = h
        .request(
            "PUT",
            "/api/channels/news/outputs",
            Some(json!([hls_output("web")])),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(channel["outputs"].as_array().unwrap().len(), 1);

    let (status, plans) = h.request("GET", "/api/channels/news/plans", None).await;
    assert_eq!(status, StatusCode::OK);
    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0]["name"], "web");
}

#[tokio::test]
async fn test_delete_channel_drops_its_schedule() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;

    let (status, _) = h.request("DELETE", "/api/channels/news", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h.request("GET", "/api/channels/news", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h.request("DELETE", "/api/channels/news", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_api_hides_private_channels() {
    let h = TestHarness::new().await;
    h.provision("news", vec![hls_output("web")]).await;
    h.ctx
        .registry
        .provision(playout::registry::ProvisionRequest {
            short_name: Some("backstage".into()),
            visibility: Some("private".into()),
            ingest: playout_common::Ingest {
                url: "rtmp://ingest/backstage".into(),
                protocol: "rtmp".into(),
            },
            ..Default::default()
        })
        .await
        .unwrap();

    let (status, list) = h.request("GET", "/api/public/channels", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["short_name"], "news");
    assert_eq!(list[0]["outputs"][0]["type"], "hls");
    // Ingest details are never public.
    assert!(list[0].get("ingest").is_none());

    let (status, _) = h.request("GET", "/api/public/channels/news", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h
        .request("GET", "/api/public/channels/backstage", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_preview() {
    let h = TestHarness::new().await;
    let ingest = json!({ "url": "rtmp://ingest/news", "protocol": "rtmp" });

    let (status, body) = h
        .request(
            "POST",
            "/api/plan",
            Some(json!({ "ingest": ingest, "output": hls_output("web") })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["args"]["src_url"], "rtmp://ingest/news");
    assert!(body["instruction"].as_str().unwrap().contains("-f hls"));

    let (status, body) = h
        .request(
            "POST",
            "/api/plan",
            Some(json!({ "ingest": ingest, "output": output("web", "dash") })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "not_implemented");

    let (status, body) = h
        .request(
            "POST",
            "/api/plan",
            Some(json!({ "ingest": ingest, "output": output("web", "bogus") })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_channel_without_mixer() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;

    let (status, _) = h.request("GET", "/api/channels/news/mixer", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.request("GET", "/api/channels/sport/mixer", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint_counts_channels() {
    let h = TestHarness::new().await;
    h.provision("news", vec![]).await;

    let addr = h.serve().await;
    let body: serde_json::Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["channels"], 1);
}
