use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file; `~` is expanded.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./playout.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// How many upcoming entries are held as pending jobs.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Seconds between reloads from the schedule store.
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: u64,

    /// Play request resolution and bitrate (kb/s) for scheduled programmes.
    #[serde(default = "default_play_width")]
    pub play_width: u32,

    #[serde(default = "default_play_height")]
    pub play_height: u32,

    #[serde(default = "default_play_bitrate")]
    pub play_bitrate: u32,
}

fn default_queue_size() -> usize {
    25
}
fn default_reload_interval() -> u64 {
    60
}
fn default_play_width() -> u32 {
    1920
}
fn default_play_height() -> u32 {
    1080
}
fn default_play_bitrate() -> u32 {
    8000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            reload_interval_secs: default_reload_interval(),
            play_width: default_play_width(),
            play_height: default_play_height(),
            play_bitrate: default_play_bitrate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Base URL of the render worker (VT).
    #[serde(default = "default_dispatch_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Probe `GET /ok` at startup and refuse to start if it fails.
    #[serde(default)]
    pub check_on_start: bool,
}

fn default_dispatch_endpoint() -> String {
    "http://localhost:7071".to_string()
}
fn default_timeout() -> u64 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_dispatch_endpoint(),
            timeout_secs: default_timeout(),
            check_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelsConfig {
    /// Display name of channels provisioned without one.
    #[serde(default = "default_channel_name")]
    pub default_name: String,

    /// Length of generated short names.
    #[serde(default = "default_short_name_length")]
    pub short_name_length: usize,

    /// Request timeout for mixer backends.
    #[serde(default = "default_timeout")]
    pub mixer_timeout_secs: u64,
}

fn default_channel_name() -> String {
    "A random livestream".to_string()
}
fn default_short_name_length() -> usize {
    10
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            default_name: default_channel_name(),
            short_name_length: default_short_name_length(),
            mixer_timeout_secs: default_timeout(),
        }
    }
}
