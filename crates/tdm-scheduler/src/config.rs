use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const CONFIG_VERSION: u32 = 1;

/// Units a path may take in one round before the scheduler rotates.
pub const DEFAULT_ROUND_SIZE: u32 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
    #[error("round size must be greater than zero")]
    ZeroRoundSize,
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Scheduling policy attached to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Quota-based round scheduling.
    #[default]
    Tdm,
}

impl SchedulerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::Tdm => "tdm",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigInput {
    pub version: u32,
    #[serde(alias = "num_segments")]
    pub round_size: Option<u32>,
    pub cwnd_limited: Option<bool>,
    pub scheduler: Option<SchedulerKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerConfig {
    pub version: u32,
    /// Round size R. Must be non-zero.
    pub round_size: u32,
    /// Require free congestion window on every path during quota selection.
    pub cwnd_limited: bool,
    pub kind: SchedulerKind,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            round_size: DEFAULT_ROUND_SIZE,
            cwnd_limited: true,
            kind: SchedulerKind::Tdm,
        }
    }
}

impl SchedulerConfigInput {
    pub fn resolve(self) -> Result<SchedulerConfig, ConfigError> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(version));
        }

        let defaults = SchedulerConfig::default();
        let config = SchedulerConfig {
            version,
            round_size: self.round_size.unwrap_or(defaults.round_size),
            cwnd_limited: self.cwnd_limited.unwrap_or(defaults.cwnd_limited),
            kind: self.scheduler.unwrap_or(defaults.kind),
        };
        config.validate()?;
        Ok(config)
    }
}

impl SchedulerConfig {
    /// A zero round size would never let a path leave the Full state, so the
    /// round-exhaustion reset could not make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_size == 0 {
            return Err(ConfigError::ZeroRoundSize);
        }
        Ok(())
    }

    pub fn with_round_size(round_size: u32) -> Result<Self, ConfigError> {
        let config = Self {
            round_size,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(SchedulerConfig::default());
        }
        let parsed: SchedulerConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }
}

/// Process-wide scheduler configuration.
///
/// Schedulers hold a clone and load a fresh snapshot on every call, so a
/// `store` takes effect on the next scheduling decision of every connection.
/// Invalid configurations are refused and the previous one stays active.
#[derive(Clone)]
pub struct SharedConfig(Arc<ArcSwap<SchedulerConfig>>);

impl SharedConfig {
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(SharedConfig(Arc::new(ArcSwap::from_pointee(config))))
    }

    pub fn snapshot(&self) -> SchedulerConfig {
        **self.0.load()
    }

    pub fn store(&self, config: SchedulerConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected scheduler config update");
            return Err(e);
        }
        self.0.store(Arc::new(config));
        Ok(())
    }

    pub fn reload_from_toml(&self, input: &str) -> Result<(), ConfigError> {
        let config = SchedulerConfig::from_toml_str(input).inspect_err(|e| {
            warn!(error = %e, "rejected scheduler config update");
        })?;
        self.store(config)
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        SharedConfig(Arc::new(ArcSwap::from_pointee(SchedulerConfig::default())))
    }
}
