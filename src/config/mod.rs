mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to load config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content).context("Failed to parse config")?;
    config.database.path = expand_path(&config.database.path);
    validate_config(&config)?;
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./playout.toml",
        "~/.config/playout/config.toml",
        "/etc/playout/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let scheduler = &config.scheduler;
    if scheduler.queue_size == 0 {
        anyhow::bail!("Scheduler queue_size must be at least 1");
    }
    if scheduler.reload_interval_secs == 0 {
        anyhow::bail!("Scheduler reload_interval_secs must be at least 1");
    }
    if scheduler.play_width == 0 || scheduler.play_height == 0 || scheduler.play_bitrate == 0 {
        anyhow::bail!("Scheduler play resolution and bitrate must be non-zero");
    }

    if !config.dispatch.endpoint.starts_with("http://")
        && !config.dispatch.endpoint.starts_with("https://")
    {
        anyhow::bail!(
            "Dispatch endpoint must be an http(s) URL: {}",
            config.dispatch.endpoint
        );
    }

    if config.channels.short_name_length < 4 {
        anyhow::bail!("Channel short_name_length must be at least 4");
    }

    Ok(())
}
