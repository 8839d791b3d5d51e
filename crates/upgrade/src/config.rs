//! Upgrade tuning, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use unitdeploy_protocol::constants::{
    CHUNK_THRESHOLD_BYTES, DEFAULT_CHUNK_SIZE, DEFAULT_UPLOAD_CONCURRENCY,
};

use crate::error::UpgradeError;

/// What to do with an existing snapshot when a new one is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPolicy {
    /// Replace the unit's existing snapshot. The unit must hold at most one.
    #[default]
    Replace,
    /// Always create an additional snapshot.
    Append,
}

/// Errors loading or writing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Tuning knobs for the upgrade pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Modules larger than this many bytes are uploaded in chunks.
    #[serde(default = "default_chunk_threshold")]
    pub chunk_threshold_bytes: usize,

    /// Size of each uploaded chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum chunk uploads in flight at once.
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    #[serde(default)]
    pub snapshot_policy: SnapshotPolicy,
}

fn default_chunk_threshold() -> usize {
    CHUNK_THRESHOLD_BYTES
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_upload_concurrency() -> usize {
    DEFAULT_UPLOAD_CONCURRENCY
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: default_chunk_threshold(),
            chunk_size: default_chunk_size(),
            upload_concurrency: default_upload_concurrency(),
            snapshot_policy: SnapshotPolicy::default(),
        }
    }
}

impl UpgradeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from `path`, or returns defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), UpgradeError> {
        if self.chunk_size == 0 {
            return Err(UpgradeError::PreconditionUnmet(
                "chunk_size must be positive".into(),
            ));
        }
        if self.upload_concurrency == 0 {
            return Err(UpgradeError::PreconditionUnmet(
                "upload_concurrency must be positive".into(),
            ));
        }
        Ok(())
    }
}
