//! Live input mixing for mixer-backed channels.
//!
//! A channel may sit behind a mixer that switches between live inputs
//! without dropping its output. The backend is chosen once, when the channel
//! is provisioned, and from then on is only reached through [`MixerHandle`].

mod brave;

pub use brave::BraveMixer;

use async_trait::async_trait;
use parking_lot::RwLock;
use playout_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A source the mixer can switch to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerInput {
    pub id: i64,
    pub uri: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerOutput {
    pub id: i64,
    pub uri: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub state: String,
}

/// What is currently on air.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Composition {
    pub id: i64,
    pub state: String,
    pub width: u32,
    pub height: u32,
    /// Input ids in the mix.
    pub sources: Vec<i64>,
}

/// Snapshot of a mixer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MixerState {
    pub inputs: Vec<MixerInput>,
    pub outputs: Vec<MixerOutput>,
    pub composition: Option<Composition>,
}

/// Input to add to a mixer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMixerInput {
    pub uri: String,
    #[serde(default = "default_input_kind")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub has_audio: bool,
    #[serde(default = "default_true")]
    pub has_video: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

fn default_input_kind() -> String {
    "uri".to_string()
}
fn default_true() -> bool {
    true
}

#[async_trait]
pub trait Mixer: Send + Sync {
    async fn state(&self) -> Result<MixerState>;
    async fn restart(&self) -> Result<()>;
    /// Add an input, returning its id.
    async fn add_input(&self, input: &NewMixerInput) -> Result<i64>;
    async fn remove_input(&self, id: i64) -> Result<()>;
}

/// Mixer backends a channel can be provisioned with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerBackend {
    Brave { endpoint: String },
}

impl MixerBackend {
    /// Parse the stored `(kind, endpoint)` pair of a channel.
    ///
    /// Both absent means the channel has no mixer.
    pub fn from_parts(kind: Option<&str>, endpoint: Option<&str>) -> Result<Option<Self>> {
        match (kind, endpoint) {
            (None, _) => Ok(None),
            (Some("brave"), Some(endpoint)) if !endpoint.is_empty() => Ok(Some(Self::Brave {
                endpoint: endpoint.to_string(),
            })),
            (Some("brave"), _) => Err(Error::validation("brave mixer requires an endpoint")),
            (Some(other), _) => Err(Error::validation(format!("unknown mixer: {}", other))),
        }
    }

    /// Connect to the backend.
    pub fn connect(&self, timeout: Duration) -> Result<Arc<dyn Mixer>> {
        match self {
            Self::Brave { endpoint } => Ok(Arc::new(BraveMixer::new(endpoint, timeout)?)),
        }
    }
}

/// A channel's mixer plus the last state pulled from it.
#[derive(Clone)]
pub struct MixerHandle {
    mixer: Arc<dyn Mixer>,
    cached: Arc<RwLock<Option<MixerState>>>,
}

impl MixerHandle {
    pub fn new(mixer: Arc<dyn Mixer>) -> Self {
        Self {
            mixer,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Last pulled state, if any.
    pub fn cached_state(&self) -> Option<MixerState> {
        self.cached.read().clone()
    }

    /// Pull fresh state from the mixer and cache it.
    pub async fn refresh(&self) -> Result<MixerState> {
        let state = self.mixer.state().await?;
        *self.cached.write() = Some(state.clone());
        Ok(state)
    }

    pub async fn restart(&self) -> Result<()> {
        self.mixer.restart().await?;
        *self.cached.write() = None;
        Ok(())
    }

    pub async fn add_input(&self, input: &NewMixerInput) -> Result<i64> {
        let id = self.mixer.add_input(input).await?;
        self.refresh_quietly().await;
        Ok(id)
    }

    pub async fn remove_input(&self, id: i64) -> Result<()> {
        self.mixer.remove_input(id).await?;
        self.refresh_quietly().await;
        Ok(())
    }

    async fn refresh_quietly(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Failed to refresh mixer state: {}", e);
            *self.cached.write() = None;
        }
    }
}

impl std::fmt::Debug for MixerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixerHandle")
            .field("cached", &self.cached.read().is_some())
            .finish()
    }
}
