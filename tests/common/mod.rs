//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which creates a file-backed SQLite database in a
//! temporary directory, a wiremock server standing in for the render worker,
//! and a full [`AppContext`] wired to both.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use playout::config::Config;
use playout::dispatch::{RenderDispatch, VtClient};
use playout::registry::{ChannelRegistry, ProvisionRequest};
use playout::scheduler::Scheduler;
use playout::server::{create_router, AppContext};
use playout_common::{Ingest, Output, Rendition};
use playout_db::models::{Channel, NewProgramme, Programme};
use playout_db::{get_conn, init_pool, queries, DbPool};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    /// Stands in for the render worker.
    pub vt: MockServer,
    _dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(mut config: Config) -> Self {
        let vt = MockServer::start().await;
        config.dispatch.endpoint = vt.uri();

        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("playout.db");
        let db = init_pool(&db_path.to_string_lossy()).expect("failed to create pool");

        let dispatch: Arc<dyn RenderDispatch> =
            Arc::new(VtClient::new(&config.dispatch).expect("failed to build VT client"));
        let registry = ChannelRegistry::new(db.clone(), dispatch.clone(), config.channels.clone());
        let scheduler = Scheduler::new(db.clone(), dispatch, config.scheduler.clone());

        let ctx = AppContext {
            db: db.clone(),
            registry,
            scheduler,
            config: Arc::new(config),
        };

        Self {
            ctx,
            db,
            vt,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Start Axum on a random port.
    pub async fn serve(&self) -> SocketAddr {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Send one request through the router and decode the JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn provision(&self, short_name: &str, outputs: Vec<Output>) -> Channel {
        self.ctx
            .registry
            .provision(ProvisionRequest {
                short_name: Some(short_name.to_string()),
                name: Some(format!("{} channel", short_name)),
                ingest: Ingest {
                    url: format!("rtmp://ingest/{}", short_name),
                    protocol: "rtmp".to_string(),
                },
                outputs,
                ..Default::default()
            })
            .await
            .expect("failed to provision channel")
    }

    pub fn add_programme(&self, title: &str, videos: &[&str]) -> Programme {
        let conn = get_conn(&self.db).unwrap();
        queries::programmes::create_programme(
            &conn,
            &NewProgramme {
                title: title.to_string(),
                description: String::new(),
                thumbnail: String::new(),
                videos: videos.iter().map(|v| v.to_string()).collect(),
            },
        )
        .unwrap()
    }
}

pub fn hls_output(name: &str) -> Output {
    Output {
        name: name.to_string(),
        output_type: "hls".to_string(),
        destination: format!("https://cdn.example/{}/index.m3u8", name),
        passthrough: false,
        renditions: vec![
            Rendition {
                width: 1920,
                height: 1080,
                bitrate: 6000,
                fps: 0,
                codec: "h264".to_string(),
            },
            Rendition {
                width: 1280,
                height: 720,
                bitrate: 3000,
                fps: 0,
                codec: "h264".to_string(),
            },
        ],
    }
}

pub fn output(name: &str, output_type: &str) -> Output {
    Output {
        name: name.to_string(),
        output_type: output_type.to_string(),
        destination: format!("rtmp://cdn.example/{}", name),
        passthrough: false,
        renditions: Vec::new(),
    }
}

/// Whole minutes from now, truncated to the second.
pub fn minutes_from_now(m: i64) -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now) + Duration::minutes(m)
}
