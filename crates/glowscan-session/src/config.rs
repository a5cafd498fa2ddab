use glowscan_core::FaceWidthSampling;
use glowscan_hw::FacingMode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Session timing and classifier configuration.
///
/// Defaults, optionally overlaid by a TOML file, then by `GLOWSCAN_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Progress tick cadence while scanning (progress advances 1 per tick).
    pub tick_interval_ms: u64,
    /// Pause between reaching 100% and entering processing.
    pub settle_delay_ms: u64,
    /// Time spent in processing before completion.
    pub finalize_delay_ms: u64,
    /// Pause before re-initializing after a camera switch.
    pub switch_delay_ms: u64,
    /// Facing mode of the first stream.
    pub facing_mode: FacingMode,
    /// Landmarks used for face width.
    pub face_width: FaceWidthSampling,
    /// Cadence of the synthetic detector used by the demo CLI.
    pub frame_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            settle_delay_ms: 500,
            finalize_delay_ms: 1000,
            switch_delay_ms: 300,
            facing_mode: FacingMode::User,
            face_width: FaceWidthSampling::Cheekbones,
            frame_interval_ms: 33,
        }
    }
}

impl Config {
    /// Load configuration from `GLOWSCAN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        self.tick_interval_ms = env_u64("GLOWSCAN_TICK_INTERVAL_MS", self.tick_interval_ms);
        self.settle_delay_ms = env_u64("GLOWSCAN_SETTLE_DELAY_MS", self.settle_delay_ms);
        self.finalize_delay_ms = env_u64("GLOWSCAN_FINALIZE_DELAY_MS", self.finalize_delay_ms);
        self.switch_delay_ms = env_u64("GLOWSCAN_SWITCH_DELAY_MS", self.switch_delay_ms);
        self.frame_interval_ms = env_u64("GLOWSCAN_FRAME_INTERVAL_MS", self.frame_interval_ms);
        if let Some(facing) = env_parse("GLOWSCAN_FACING_MODE", |v| v.parse().ok()) {
            self.facing_mode = facing;
        }
        if let Some(width) = env_parse("GLOWSCAN_FACE_WIDTH", |v| match v {
            "cheekbones" => Some(FaceWidthSampling::Cheekbones),
            "legacy" => Some(FaceWidthSampling::Legacy),
            _ => None,
        }) {
            self.face_width = width;
        }
    }

    pub fn tick_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn finalize_delay(&self) -> Duration {
        Duration::from_millis(self.finalize_delay_ms)
    }

    pub fn switch_delay(&self) -> Duration {
        Duration::from_millis(self.switch_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_parse<T>(key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let value = std::env::var(key).ok()?;
    let parsed = parse(value.trim());
    if parsed.is_none() {
        tracing::warn!(key, value = %value, "ignoring unrecognized config value");
    }
    parsed
}
