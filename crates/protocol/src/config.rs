//! Protocol configuration
//!
//! Every field has a serde default so a partial (or empty) JSON file is a
//! valid configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Oldest acceptable price quote, in seconds
    #[serde(default = "default_max_price_age_secs")]
    pub max_price_age_secs: i64,

    /// Directory for the JSONL event log (CLI only)
    #[serde(default)]
    pub event_dir: Option<PathBuf>,
}

fn default_max_price_age_secs() -> i64 {
    3600 // 1 hour
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_price_age_secs: default_max_price_age_secs(),
            event_dir: None,
        }
    }
}

impl ProtocolConfig {
    /// Load config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        if config.max_price_age_secs < 0 {
            anyhow::bail!(
                "max_price_age_secs must not be negative, got {}",
                config.max_price_age_secs
            );
        }
        Ok(config)
    }

    pub fn max_price_age(&self) -> Duration {
        Duration::seconds(self.max_price_age_secs)
    }

    pub fn with_max_price_age_secs(mut self, secs: i64) -> Self {
        self.max_price_age_secs = secs;
        self
    }
}
