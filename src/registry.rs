//! Channel registry.
//!
//! Holds every provisioned channel in memory, keyed by short name, together
//! with its mixer handle. The store is the source of truth; the registry is
//! loaded from it at startup and written through on every change.

use dashmap::DashMap;
use futures::future::join_all;
use playout_av::{plan_channel, OutputPlan};
use playout_common::{ChannelId, ChannelStatus, ChannelType, Error, Ingest, Output, Result};
use playout_db::models::{Channel, NewChannel};
use playout_db::{queries, DbPool};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ChannelsConfig;
use crate::dispatch::{RenderDispatch, Task};
use crate::mixer::{MixerBackend, MixerHandle};
use crate::store::with_conn;

// Attempts at finding an unused generated short name.
const MAX_NAME_ATTEMPTS: usize = 16;

/// A channel and the live resources attached to it.
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    pub channel: Channel,
    pub mixer: Option<MixerHandle>,
}

/// Request to provision a channel. Everything but the ingest is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub channel_type: ChannelType,
    pub ingest: Ingest,
    #[serde(default)]
    pub slate_url: String,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub dvr: bool,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub mixer_kind: Option<String>,
    #[serde(default)]
    pub mixer_endpoint: Option<String>,
}

/// Result of starting one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputReport {
    pub name: String,
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of starting a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub channel: ChannelId,
    pub status: ChannelStatus,
    pub outputs: Vec<OutputReport>,
}

#[derive(Clone)]
pub struct ChannelRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    pool: DbPool,
    dispatch: Arc<dyn RenderDispatch>,
    channels: DashMap<ChannelId, ChannelEntry>,
    settings: ChannelsConfig,
}

impl ChannelRegistry {
    pub fn new(pool: DbPool, dispatch: Arc<dyn RenderDispatch>, settings: ChannelsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                dispatch,
                channels: DashMap::new(),
                settings,
            }),
        }
    }

    fn mixer_timeout(&self) -> Duration {
        Duration::from_secs(self.inner.settings.mixer_timeout_secs)
    }

    /// Load every stored channel. Returns how many were loaded.
    ///
    /// A channel whose mixer cannot be set up is still loaded, without one.
    pub async fn load(&self) -> Result<usize> {
        let channels = with_conn(&self.inner.pool, |conn| queries::channels::list_channels(conn)).await?;
        let count = channels.len();

        for channel in channels {
            let mixer = match connect_mixer(&channel, self.mixer_timeout()) {
                Ok(mixer) => mixer,
                Err(e) => {
                    tracing::warn!("Channel {}: mixer unavailable: {}", channel.short_name, e);
                    None
                }
            };
            self.inner
                .channels
                .insert(channel.short_name.clone(), ChannelEntry { channel, mixer });
        }

        tracing::info!("Loaded {} channels", count);
        Ok(count)
    }

    pub fn get(&self, short_name: &ChannelId) -> Option<ChannelEntry> {
        self.inner.channels.get(short_name).map(|e| e.value().clone())
    }

    pub fn mixer(&self, short_name: &ChannelId) -> Option<MixerHandle> {
        self.inner
            .channels
            .get(short_name)
            .and_then(|e| e.mixer.clone())
    }

    /// All channels ordered by short name.
    pub fn list(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .inner
            .channels
            .iter()
            .map(|e| e.channel.clone())
            .collect();
        channels.sort_by(|a, b| a.short_name.cmp(&b.short_name));
        channels
    }

    fn require(&self, short_name: &ChannelId) -> Result<ChannelEntry> {
        self.get(short_name)
            .ok_or_else(|| Error::not_found("channel", short_name))
    }

    /// Create a channel, persist it and attach its mixer.
    pub async fn provision(&self, request: ProvisionRequest) -> Result<Channel> {
        let backend = MixerBackend::from_parts(
            request.mixer_kind.as_deref(),
            request.mixer_endpoint.as_deref(),
        )?;
        if request.ingest.url.trim().is_empty() {
            return Err(Error::validation("ingest url is required"));
        }

        let explicit = match request.short_name.as_deref().map(str::trim) {
            Some("") => return Err(Error::validation("short name must not be empty")),
            Some(name) => Some(ChannelId::from(name)),
            None => None,
        };

        let mut new = NewChannel {
            short_name: explicit.clone().unwrap_or_else(|| self.generate_short_name()),
            name: request
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| self.inner.settings.default_name.clone()),
            description: request.description,
            thumbnail_url: request.thumbnail_url,
            channel_type: request.channel_type,
            ingest: request.ingest,
            slate_url: request.slate_url,
            outputs: request.outputs,
            archive: request.archive,
            dvr: request.dvr,
            visibility: request.visibility.unwrap_or_else(|| "public".to_string()),
            mixer_kind: request.mixer_kind,
            mixer_endpoint: request.mixer_endpoint,
        };

        let mixer = match &backend {
            Some(backend) => Some(MixerHandle::new(backend.connect(self.mixer_timeout())?)),
            None => None,
        };

        let mut attempts = 0;
        let channel = loop {
            attempts += 1;
            let candidate = new.clone();
            match with_conn(&self.inner.pool, move |conn| {
                queries::channels::create_channel(conn, &candidate)
            })
            .await
            {
                Ok(channel) => break channel,
                // a generated name collided with a stored one
                Err(Error::Conflict(_)) if explicit.is_none() && attempts < MAX_NAME_ATTEMPTS => {
                    new.short_name = self.generate_short_name();
                }
                Err(e) => return Err(e),
            }
        };

        tracing::info!("Provisioned channel {} ({})", channel.short_name, channel.name);
        self.inner.channels.insert(
            channel.short_name.clone(),
            ChannelEntry {
                channel: channel.clone(),
                mixer,
            },
        );
        Ok(channel)
    }

    fn generate_short_name(&self) -> ChannelId {
        let len = self.inner.settings.short_name_length;
        let mut rng = rand::thread_rng();
        loop {
            let name: String = (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect();
            let id = ChannelId::from(name);
            if !self.inner.channels.contains_key(&id) {
                return id;
            }
        }
    }

    /// Stop a channel and delete it together with its schedule.
    pub async fn remove(&self, short_name: &ChannelId) -> Result<()> {
        let entry = self.require(short_name)?;
        if entry.channel.status != ChannelStatus::Pending {
            self.stop(short_name).await?;
        }

        let id = short_name.clone();
        with_conn(&self.inner.pool, move |conn| {
            queries::channels::delete_channel(conn, &id)
        })
        .await?;

        self.inner.channels.remove(short_name);
        tracing::info!("Removed channel {}", short_name);
        Ok(())
    }

    /// Plan every output of a channel without dispatching anything.
    pub fn plans(&self, short_name: &ChannelId) -> Result<Vec<OutputPlan>> {
        let channel = self.require(short_name)?.channel;
        Ok(plan_channel(&channel.ingest, channel.dvr, &channel.outputs))
    }

    /// Plan every output and hand each planned one to the render worker.
    ///
    /// The channel ends up running if at least one output started, and back
    /// at pending otherwise.
    pub async fn start(&self, short_name: &ChannelId) -> Result<StartReport> {
        let (channel, previous) = self.claim_start(short_name)?;

        if let Err(e) = self.set_status(short_name, ChannelStatus::Starting).await {
            if let Some(mut entry) = self.inner.channels.get_mut(short_name) {
                entry.channel.status = previous;
            }
            return Err(e);
        }

        // Outputs are independent; submit them together and report in order.
        let plans = plan_channel(&channel.ingest, channel.dvr, &channel.outputs);
        let outputs: Vec<OutputReport> =
            join_all(plans.iter().map(|plan| self.start_output(short_name, plan))).await;

        let status = if outputs.iter().any(|o| o.started) {
            ChannelStatus::Running
        } else {
            ChannelStatus::Pending
        };
        self.set_status(short_name, status).await?;
        tracing::info!(
            "Channel {} is {} ({} of {} outputs started)",
            short_name,
            status,
            outputs.iter().filter(|o| o.started).count(),
            outputs.len()
        );

        Ok(StartReport {
            channel: short_name.clone(),
            status,
            outputs,
        })
    }

    // Moves the in-memory status to Starting while holding the map entry, so
    // concurrent starts of one channel cannot both pass the check. Returns
    // the channel and the status it had before.
    fn claim_start(&self, short_name: &ChannelId) -> Result<(Channel, ChannelStatus)> {
        let mut entry = self
            .inner
            .channels
            .get_mut(short_name)
            .ok_or_else(|| Error::not_found("channel", short_name))?;

        let previous = entry.channel.status;
        if matches!(previous, ChannelStatus::Running | ChannelStatus::Starting) {
            return Err(Error::Conflict(format!(
                "channel {} is already {}",
                short_name, previous
            )));
        }
        entry.channel.status = ChannelStatus::Starting;
        Ok((entry.channel.clone(), previous))
    }

    async fn start_output(&self, short_name: &ChannelId, plan: &OutputPlan) -> OutputReport {
        let Some(encode) = plan.plan() else {
            let error = plan.error().unwrap_or_default().to_string();
            tracing::warn!("Channel {}: output {} not planned: {}", short_name, plan.name, error);
            return OutputReport {
                name: plan.name.clone(),
                started: false,
                error: Some(error),
            };
        };

        let task = Task::new(format!("{}/{}", short_name, plan.name), encode.to_task_args());
        match self.inner.dispatch.submit_live(&task).await {
            Ok(()) => OutputReport {
                name: plan.name.clone(),
                started: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Channel {}: output {} not started: {}", short_name, plan.name, e);
                OutputReport {
                    name: plan.name.clone(),
                    started: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Stop a channel.
    pub async fn stop(&self, short_name: &ChannelId) -> Result<ChannelStatus> {
        self.require(short_name)?;
        self.set_status(short_name, ChannelStatus::Stopping).await?;
        // TODO: cancel the channel's live tasks once the render worker exposes a stop endpoint
        self.set_status(short_name, ChannelStatus::Pending).await?;
        tracing::info!("Stopped channel {}", short_name);
        Ok(ChannelStatus::Pending)
    }

    /// Replace a stopped channel's outputs.
    pub async fn update_outputs(&self, short_name: &ChannelId, outputs: Vec<Output>) -> Result<Channel> {
        let entry = self.require(short_name)?;
        if entry.channel.status != ChannelStatus::Pending {
            return Err(Error::Conflict(format!(
                "channel {} must be stopped to change outputs",
                short_name
            )));
        }

        let id = short_name.clone();
        let stored = outputs.clone();
        with_conn(&self.inner.pool, move |conn| {
            queries::channels::update_channel_outputs(conn, &id, &stored)
        })
        .await?;

        let mut entry = self
            .inner
            .channels
            .get_mut(short_name)
            .ok_or_else(|| Error::not_found("channel", short_name))?;
        entry.channel.outputs = outputs;
        Ok(entry.channel.clone())
    }

    async fn set_status(&self, short_name: &ChannelId, status: ChannelStatus) -> Result<()> {
        let id = short_name.clone();
        with_conn(&self.inner.pool, move |conn| {
            queries::channels::update_channel_status(conn, &id, status)
        })
        .await?;

        if let Some(mut entry) = self.inner.channels.get_mut(short_name) {
            entry.channel.status = status;
        }
        tracing::debug!("Channel {} -> {}", short_name, status);
        Ok(())
    }
}

fn connect_mixer(channel: &Channel, timeout: Duration) -> Result<Option<MixerHandle>> {
    let backend = MixerBackend::from_parts(
        channel.mixer_kind.as_deref(),
        channel.mixer_endpoint.as_deref(),
    )?;
    backend
        .map(|b| b.connect(timeout).map(MixerHandle::new))
        .transpose()
}
