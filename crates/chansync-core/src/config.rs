//! Configuration module for chansync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation and defaults. A configuration describes
//! the Azure AD application used for authentication, transfer tuning knobs,
//! the retry policy, and the mapping of local source directories to Teams
//! channel destinations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Graph requires upload-session chunk sizes to be multiples of 320 KiB.
pub const CHUNK_ALIGNMENT: u64 = 320 * 1024;

/// Top-level configuration for chansync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub mappings: Vec<MappingConfig>,
}

/// Azure AD application credentials (client-credentials flow).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    /// Name of the environment variable holding the client secret.
    /// The secret itself never appears in the configuration file.
    pub client_secret_env: String,
}

/// Upload strategy and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Files at or above this size (in MiB) use a resumable upload session.
    pub large_file_threshold_mib: u64,
    /// Size of each upload-session chunk (in MiB), within [5, 60].
    pub chunk_size_mib: u64,
    /// Maximum number of simultaneously in-flight file uploads.
    pub concurrency: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            large_file_threshold_mib: 4,
            chunk_size_mib: 10,
            concurrency: 8,
        }
    }
}

impl TransferConfig {
    /// Threshold in bytes above which the chunked path is taken.
    pub fn large_file_threshold_bytes(&self) -> u64 {
        self.large_file_threshold_mib * 1024 * 1024
    }

    /// Chunk size in bytes, floored to the 320 KiB alignment Graph requires.
    pub fn chunk_size_bytes(&self) -> u64 {
        let raw = self.chunk_size_mib * 1024 * 1024;
        (raw / CHUNK_ALIGNMENT).max(1) * CHUNK_ALIGNMENT
    }
}

/// Retry/backoff policy applied by the request gate and the chunk uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per request (first try included).
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds; doubles per retry.
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// One destination channel and the local directories replicated into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Microsoft 365 group id backing the team.
    pub group_id: String,
    /// Channel id whose files folder is the destination root.
    pub channel_id: String,
    /// Source directories to replicate.
    pub sources: Vec<SourceConfig>,
}

/// A local directory and the name of its remote top-level folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Absolute path of the local directory to replicate.
    pub path: PathBuf,
    /// Remote top-level folder name; defaults to the directory's basename.
    #[serde(default)]
    pub name: Option<String>,
}

impl SourceConfig {
    /// The remote folder name this source replicates into.
    pub fn remote_name(&self) -> Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| {
                format!(
                    "source path {} has no basename; set an explicit name",
                    self.path.display()
                )
            })
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks bounds and required fields. Called by [`Config::load`]; exposed
    /// for programmatic construction.
    pub fn validate(&self) -> Result<()> {
        if self.auth.tenant_id.is_empty() || self.auth.client_id.is_empty() {
            bail!("auth.tenant_id and auth.client_id are required");
        }
        if self.auth.client_secret_env.is_empty() {
            bail!("auth.client_secret_env must name an environment variable");
        }
        if self.transfer.large_file_threshold_mib < 1 {
            bail!("transfer.large_file_threshold_mib must be at least 1");
        }
        if !(5..=60).contains(&self.transfer.chunk_size_mib) {
            bail!(
                "transfer.chunk_size_mib must be within [5, 60], got {}",
                self.transfer.chunk_size_mib
            );
        }
        if !(1..=64).contains(&self.transfer.concurrency) {
            bail!(
                "transfer.concurrency must be within [1, 64], got {}",
                self.transfer.concurrency
            );
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.mappings.is_empty() {
            bail!("at least one mapping is required");
        }
        for (i, mapping) in self.mappings.iter().enumerate() {
            if mapping.group_id.is_empty() || mapping.channel_id.is_empty() {
                bail!("mappings[{i}]: group_id and channel_id are required");
            }
            if mapping.sources.is_empty() {
                bail!("mappings[{i}]: at least one source is required");
            }
            for source in &mapping.sources {
                source.remote_name()?;
            }
        }
        Ok(())
    }

    /// Reads the client secret from the configured environment variable.
    pub fn client_secret(&self) -> Result<String> {
        std::env::var(&self.auth.client_secret_env).with_context(|| {
            format!(
                "client secret environment variable {} is not set",
                self.auth.client_secret_env
            )
        })
    }
}
