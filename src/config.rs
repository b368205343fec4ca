use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// PostgreSQL connection URL for the account ledger
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sequences: SequenceConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout_secs: 5,
        }
    }
}

/// How transaction ordinals are allocated within a calendar day.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SequenceMode {
    /// Counter row bumped inside the transfer's own database transaction.
    #[default]
    Persisted,
    /// Process-local counter reseeded from the max stored id on day rollover.
    InProcess,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SequenceConfig {
    pub account_prefix: String,
    pub customer_prefix: String,
    pub user_prefix: String,
    pub transaction_prefix: String,
    #[serde(default)]
    pub transaction_mode: SequenceMode,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            account_prefix: "ACC_".to_string(),
            customer_prefix: "CUST_".to_string(),
            user_prefix: "USER_".to_string(),
            transaction_prefix: "TXN_".to_string(),
            transaction_mode: SequenceMode::Persisted,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Bounded queue between committed transfers and the delivery task
    pub queue_size: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_size: 1024,
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> anyhow::Result<Self> {
        Self::from_file(format!("config/{}.yaml", env))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config yaml: {}", e))?;
        Ok(config)
    }
}
