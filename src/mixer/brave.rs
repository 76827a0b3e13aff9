use async_trait::async_trait;
use playout_common::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Composition, Mixer, MixerInput, MixerOutput, MixerState, NewMixerInput};

const SERVICE: &str = "brave";

/// Brave mixer reached over its REST API.
pub struct BraveMixer {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BraveState {
    #[serde(default)]
    inputs: Vec<BraveBlock>,
    #[serde(default)]
    outputs: Vec<BraveBlock>,
    #[serde(default)]
    mixers: Vec<BraveMix>,
}

#[derive(Debug, Deserialize)]
struct BraveBlock {
    id: i64,
    #[serde(default)]
    uri: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct BraveMix {
    id: i64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    sources: Vec<BraveSource>,
}

#[derive(Debug, Deserialize)]
struct BraveSource {
    id: i64,
    #[serde(default)]
    in_mix: bool,
}

#[derive(Debug, Deserialize)]
struct NewInputResponse {
    id: i64,
}

impl From<BraveState> for MixerState {
    fn from(b: BraveState) -> Self {
        // The lowest-numbered mixer is the programme mix.
        let composition = b.mixers.into_iter().min_by_key(|m| m.id).map(|m| Composition {
            id: m.id,
            state: m.state,
            width: m.width,
            height: m.height,
            sources: m
                .sources
                .into_iter()
                .filter(|s| s.in_mix)
                .map(|s| s.id)
                .collect(),
        });

        Self {
            inputs: b
                .inputs
                .into_iter()
                .map(|i| MixerInput {
                    id: i.id,
                    uri: i.uri,
                    kind: i.kind,
                    state: i.state,
                    width: i.width,
                    height: i.height,
                })
                .collect(),
            outputs: b
                .outputs
                .into_iter()
                .map(|o| MixerOutput {
                    id: o.id,
                    uri: o.uri,
                    kind: o.kind,
                    state: o.state,
                })
                .collect(),
            composition,
        }
    }
}

impl BraveMixer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::dependency(SERVICE, format!("{}: {}", status, body)))
    }
}

fn request_failed(e: reqwest::Error) -> Error {
    Error::dependency(SERVICE, e.to_string())
}

#[async_trait]
impl Mixer for BraveMixer {
    async fn state(&self) -> Result<MixerState> {
        let response = self
            .client
            .get(self.url("/api/all"))
            .send()
            .await
            .map_err(request_failed)?;
        let state: BraveState = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_failed)?;
        Ok(state.into())
    }

    async fn restart(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("/api/restart"))
            .json(&serde_json::json!({ "config": "current" }))
            .send()
            .await
            .map_err(request_failed)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn add_input(&self, input: &NewMixerInput) -> Result<i64> {
        let body = serde_json::json!({
            "uri": input.uri,
            "type": input.kind,
            "has_audio": input.has_audio,
            "has_video": input.has_video,
            "width": input.width,
            "height": input.height,
        });
        let response = self
            .client
            .put(self.url("/api/inputs"))
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;
        let created: NewInputResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_failed)?;
        Ok(created.id)
    }

    async fn remove_input(&self, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/inputs/{}", id)))
            .send()
            .await
            .map_err(request_failed)?;
        Self::check(response).await?;
        Ok(())
    }
}
