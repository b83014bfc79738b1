//! Configuration types and YAML loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ToolSyncError, ToolSyncResult};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolSyncConfig {
    /// Agent runtime connection settings.
    pub runtime: RuntimeConfig,

    /// Reconciliation execution settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Candidate search-result cache settings.
    #[serde(default)]
    pub search_cache: SearchCacheConfig,

    /// Background index sync settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Base URL of the agent runtime API, e.g. `https://runtime.example.com/v1`.
    pub base_url: String,

    /// Bearer-style token sent on every runtime call, if required.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request network timeout in seconds. Every outbound call carries
    /// this ceiling; there are no unbounded requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl RuntimeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Attempts per attach/detach operation before recording a failure.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between attempts, in milliseconds. Not exponential:
    /// detach latency is dominated by the runtime's consistency window,
    /// not by congestion.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Maximum in-flight attachments. Detachments are always sequential.
    #[serde(default = "default_attach_fan_out")]
    pub attach_fan_out: usize,

    /// Candidate limit used when the caller does not supply one.
    #[serde(default = "default_candidate_limit")]
    pub default_limit: usize,
}

impl ReconcileConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            attach_fan_out: default_attach_fan_out(),
            default_limit: default_candidate_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchCacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time-to-live for cached search results, in seconds. Staleness is an
    /// accepted trade-off; the cache is never consulted for attachment state.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl SearchCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Interval between index sync passes, in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_attach_fan_out() -> usize {
    4
}

fn default_candidate_limit() -> usize {
    10
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl ToolSyncConfig {
    /// Load configuration from a YAML file.
    pub async fn from_file(path: &str) -> ToolSyncResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| ToolSyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ToolSyncResult<()> {
        if self.runtime.base_url.is_empty() {
            return Err(ToolSyncError::Config(
                "runtime.base_url must be set".to_string(),
            ));
        }
        if self.reconcile.retry_attempts == 0 {
            return Err(ToolSyncError::Config(
                "reconcile.retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.reconcile.attach_fan_out == 0 {
            return Err(ToolSyncError::Config(
                "reconcile.attach_fan_out must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let yaml = r#"
runtime:
  base_url: "https://runtime.example.com/v1"
"#;
        let config: ToolSyncConfig = serde_yaml::from_str(yaml).expect("Failed to parse YAML");
        assert_eq!(config.runtime.request_timeout_secs, 10);
        assert_eq!(config.reconcile.retry_attempts, 3);
        assert_eq!(config.reconcile.retry_delay_ms, 500);
        assert_eq!(config.reconcile.attach_fan_out, 4);
        assert!(config.search_cache.enabled);
        assert_eq!(config.sync.interval_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
runtime:
  base_url: "https://runtime.example.com/v1"
  auth_token: "secret"
  request_timeout_secs: 5
reconcile:
  retry_attempts: 2
  retry_delay_ms: 100
  attach_fan_out: 8
  default_limit: 20
search_cache:
  enabled: false
  ttl_secs: 30
sync:
  interval_secs: 600
"#;
        let config: ToolSyncConfig = serde_yaml::from_str(yaml).expect("Failed to parse YAML");
        assert_eq!(config.runtime.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.reconcile.retry_attempts, 2);
        assert_eq!(config.reconcile.default_limit, 20);
        assert!(!config.search_cache.enabled);
        assert_eq!(config.sync.interval_secs, 600);
    }

    #[test]
    fn test_validation_rejects_empty_base_url() {
        let config = ToolSyncConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_retries() {
        let yaml = r#"
runtime:
  base_url: "https://runtime.example.com/v1"
reconcile:
  retry_attempts: 0
"#;
        let config: ToolSyncConfig = serde_yaml::from_str(yaml).expect("Failed to parse YAML");
        assert!(config.validate().is_err());
    }
}
