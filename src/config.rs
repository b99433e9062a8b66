use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gst::ByteOrder;
use crate::recording::RecorderConfig;

/// Prefix of environment variables overriding config keys
const ENV_PREFIX: &str = "GALAXYGST";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tick while attached, in milliseconds
    pub poll_interval_ms: u64,
    /// Tick while looking for Dolphin, in milliseconds
    pub connect_interval_ms: u64,
    /// Frames per second written to the file header
    pub playback_rate: u16,
    pub byte_order: ByteOrder,
}

impl Config {
    /// Load defaults, then the optional file at `path`, then
    /// `GALAXYGST_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("poll_interval_ms", 4i64)?
            .set_default("connect_interval_ms", 1000i64)?
            .set_default("playback_rate", 60i64)?
            .set_default("byte_order", "big")?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| match path {
                Some(path) => format!("Failed to load config from {}", path.display()),
                None => "Failed to load config".to_string(),
            })?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be at least 1");
        }
        if config.connect_interval_ms == 0 {
            anyhow::bail!("connect_interval_ms must be at least 1");
        }
        if config.playback_rate == 0 {
            anyhow::bail!("playback_rate must be at least 1");
        }

        Ok(config)
    }

    /// Recorder settings for writing into `output_dir`
    pub fn recorder_config(&self, output_dir: PathBuf, recorder_info_ptr: u32) -> RecorderConfig {
        RecorderConfig {
            recorder_info_ptr,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            connect_interval: Duration::from_millis(self.connect_interval_ms),
            playback_rate: self.playback_rate,
            byte_order: self.byte_order,
            ..RecorderConfig::new(output_dir)
        }
    }
}
