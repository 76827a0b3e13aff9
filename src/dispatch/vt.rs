use async_trait::async_trait;
use playout_common::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{PlayRequest, RenderDispatch, Task};
use crate::config::DispatchConfig;

const SERVICE: &str = "render dispatch";

/// HTTP client for the VT render worker.
pub struct VtClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayBody<'a> {
    encode_args: EncodeArgs,
    videos: &'a [String],
}

#[derive(Serialize)]
struct EncodeArgs {
    args: String,
    #[serde(rename = "dstArgs")]
    dst_args: String,
    #[serde(rename = "dstURL")]
    dst_url: String,
}

impl VtClient {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Check the worker is up (`GET /ok`).
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/ok", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::dependency(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::dependency(
                SERVICE,
                format!("health check returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::dependency(SERVICE, e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::dependency(
                SERVICE,
                format!("{} returned {}: {}", path, status, text),
            ));
        }

        tracing::debug!(path, %status, body = %text, "Render worker accepted task");
        Ok(())
    }
}

#[async_trait]
impl RenderDispatch for VtClient {
    async fn play(&self, request: &PlayRequest) -> Result<()> {
        let body = PlayBody {
            encode_args: EncodeArgs {
                args: "-re".to_string(),
                dst_args: format!(
                    "-c:v libx264 -b:v {}k -s {}x{} -c:a aac -ar 48000 -f flv",
                    request.bitrate, request.width, request.height
                ),
                dst_url: request.destination.clone(),
            },
            videos: &request.videos,
        };
        self.post("/task/play", &body).await
    }

    async fn submit_live(&self, task: &Task) -> Result<()> {
        self.post("/new_live", task).await
    }
}
