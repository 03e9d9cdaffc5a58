//! Daemon configuration, layered from environment variables
//!
//! Variables use the `LWGS` prefix with `__` as section separator, e.g.
//! `LWGS_DB_PATH`, `LWGS_SEDEX__SENDER_ID`, `LWGS_SEDEX__MULTI_SENDER`,
//! `LWGS_SEDEX__SENDER_IDS` (comma separated),
//! `LWGS_TRANSACTION_STATE_WORKERS`, `LWGS_SEDEX_STATE_WORKERS`.

use anyhow::Result;
use serde::Deserialize;

use lwgs_core::config::SedexConfig;

const DEFAULT_DB_PATH: &str = "~/.lwgs/sync.db";

#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub sedex: SedexSection,

    /// Bounded worker pool for transaction-state (clamped to 2..=16)
    #[serde(default = "default_transaction_state_workers")]
    pub transaction_state_workers: usize,

    /// Smaller pool for sedex-state
    #[serde(default = "default_sedex_state_workers")]
    pub sedex_state_workers: usize,

    /// Period of the queue-depth log line
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct SedexSection {
    #[serde(default = "default_sender_id")]
    pub sender_id: String,
    #[serde(default)]
    pub multi_sender: bool,
    /// Comma-separated list, only read in multi-sender mode
    #[serde(default)]
    pub sender_ids: Option<String>,
}

impl Default for SedexSection {
    fn default() -> Self {
        Self {
            sender_id: default_sender_id(),
            multi_sender: false,
            sender_ids: None,
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_sender_id() -> String {
    "lwgs".to_string()
}

fn default_transaction_state_workers() -> usize {
    4
}

fn default_sedex_state_workers() -> usize {
    2
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("LWGS").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn expanded_db_path(&self) -> String {
        shellexpand::tilde(&self.db_path).into_owned()
    }

    pub fn sedex_config(&self) -> SedexConfig {
        if self.sedex.multi_sender {
            let ids = self
                .sedex
                .sender_ids
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            SedexConfig::multi(ids)
        } else {
            SedexConfig::single(self.sedex.sender_id.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_sender_list_parsing() {
        let config = DaemonConfig {
            db_path: default_db_path(),
            sedex: SedexSection {
                sender_id: "ignored".to_string(),
                multi_sender: true,
                sender_ids: Some("S1, S2 ,S3".to_string()),
            },
            transaction_state_workers: 4,
            sedex_state_workers: 2,
            stats_interval_secs: 60,
        };

        let sedex = config.sedex_config();
        assert!(sedex.resolve_sender(Some("S2")).is_ok());
        assert!(sedex.resolve_sender(Some("S4")).is_err());
    }

    #[test]
    fn test_single_sender_default() {
        let config = DaemonConfig {
            db_path: default_db_path(),
            sedex: SedexSection::default(),
            transaction_state_workers: 4,
            sedex_state_workers: 2,
            stats_interval_secs: 60,
        };

        let sedex = config.sedex_config();
        assert_eq!(sedex.resolve_sender(None).unwrap(), "lwgs");
    }
}
