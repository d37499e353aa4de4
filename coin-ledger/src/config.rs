//! Configuration for the ledger process

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for the store
    pub data_dir: PathBuf,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Actor and query configuration
    #[serde(default)]
    pub ledger: LedgerTuning,

    /// Account ids the local dispatcher treats as platform administrators
    #[serde(default)]
    pub platform_admins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/coin-ledger"),
            storage: StorageConfig::default(),
            ledger: LedgerTuning::default(),
            platform_admins: Vec::new(),
        }
    }
}

/// Which store implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// RocksDB in `data_dir`
    RocksDb,
    /// One JSON document in `data_dir`
    Json,
    /// Nothing survives the process
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rocksdb" => Ok(StorageBackend::RocksDb),
            "json" => Ok(StorageBackend::Json),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(crate::Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend
    pub backend: StorageBackend,

    /// Document name for the JSON backend
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::RocksDb,
            file_name: "economy_data.json".to_string(),
        }
    }
}

/// Actor and query tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTuning {
    /// Bounded actor mailbox size
    pub mailbox_capacity: usize,

    /// Deadline for a single operation (milliseconds)
    pub operation_timeout_ms: u64,

    /// Entries returned by the leaderboard
    pub leaderboard_size: usize,
}

impl Default for LedgerTuning {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            operation_timeout_ms: 5_000,
            leaderboard_size: 10,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("COIN_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(backend) = std::env::var("COIN_LEDGER_BACKEND") {
            config.storage.backend = backend.parse()?;
        }

        if let Ok(timeout) = std::env::var("COIN_LEDGER_TIMEOUT_MS") {
            config.ledger.operation_timeout_ms = timeout.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid COIN_LEDGER_TIMEOUT_MS: {}", e))
            })?;
        }

        if let Ok(admins) = std::env::var("COIN_LEDGER_PLATFORM_ADMINS") {
            config.platform_admins = admins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::RocksDb);
        assert_eq!(config.ledger.leaderboard_size, 10);
    }

    #[test]
    fn test_from_toml() {
        let content = r#"
            data_dir = "/tmp/coins"
            platform_admins = ["1", "2"]

            [storage]
            backend = "json"
            file_name = "coins.json"
        "#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.storage.file_name, "coins.json");
        assert_eq!(config.ledger.operation_timeout_ms, 5_000);
        assert_eq!(config.platform_admins, vec!["1", "2"]);
    }

    #[test]
    fn test_from_file_minimal() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("coin-ledger.toml");
        std::fs::write(&path, "data_dir = \"/var/lib/coins\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/coins"));
        assert_eq!(config.storage.file_name, "economy_data.json");
        assert!(config.platform_admins.is_empty());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("RocksDB".parse::<StorageBackend>().unwrap(), StorageBackend::RocksDb);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}
