//! Durable ledger storage
//!
//! A store loads and saves whole [`Snapshot`]s. A save either lands
//! completely or leaves the previous snapshot in place; stores do no
//! locking of their own, the actor serializes writers.
//!
//! # Backends
//!
//! - [`RocksStore`] - RocksDB, column families `accounts` (key: account id)
//!   and `config` (single key), committed with one `WriteBatch`
//! - [`JsonFileStore`] - the snapshot as one JSON document, replaced by
//!   write-to-temp + rename
//! - [`MemoryStore`] - in-process, for tests

use crate::{
    config::{StorageBackend, StorageConfig},
    error::{Error, Result},
    types::{Account, AccountId, LedgerSettings, Snapshot},
};
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_CONFIG: &str = "config";

/// Key of the settings record in `CF_CONFIG`
const CONFIG_KEY: &[u8] = b"ledger";

/// Durable snapshot storage
pub trait LedgerStore: Send + Sync {
    /// Read the current snapshot, or an empty one if nothing was saved yet
    fn load(&self) -> Result<Snapshot>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Open the backend selected in `config` under `data_dir`
pub fn open_store(data_dir: &Path, config: &StorageConfig) -> Result<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match config.backend {
        StorageBackend::RocksDb => Arc::new(RocksStore::open(data_dir)?),
        StorageBackend::Json => Arc::new(JsonFileStore::open(data_dir.join(&config.file_name))?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::info!(backend = ?config.backend, path = ?data_dir, "Ledger store opened");
    Ok(store)
}

/// RocksDB-backed store
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_CONFIG, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        tracing::debug!("Opened RocksDB at {:?}", path);

        Ok(Self { db })
    }

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Read on every operation, favour speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }
}

impl LedgerStore for RocksStore {
    fn load(&self) -> Result<Snapshot> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_config = self.cf_handle(CF_CONFIG)?;

        // Both column families are read at one sequence number
        let view = self.db.snapshot();

        let mut snapshot = Snapshot::new();
        for item in view.iterator_cf(cf_accounts, IteratorMode::Start) {
            let (key, value) = item?;
            let id = std::str::from_utf8(&key)
                .map_err(|e| Error::Serialization(format!("Account key is not UTF-8: {}", e)))?;
            let account: Account = bincode::deserialize(&value)?;
            snapshot.users.insert(AccountId::new(id), account);
        }

        if let Some(value) = view.get_cf(cf_config, CONFIG_KEY)? {
            snapshot.config = serde_json::from_slice::<LedgerSettings>(&value)?;
        }

        tracing::debug!(accounts = snapshot.users.len(), "Snapshot loaded from RocksDB");
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_config = self.cf_handle(CF_CONFIG)?;

        let mut batch = WriteBatch::default();
        for (id, account) in &snapshot.users {
            batch.put_cf(cf_accounts, id.as_str().as_bytes(), bincode::serialize(account)?);
        }

        // Accounts are never deleted by the ledger, but a snapshot that
        // dropped one must not leave it behind
        let live: HashSet<&str> = snapshot.users.keys().map(|id| id.as_str()).collect();
        for item in self.db.iterator_cf(cf_accounts, IteratorMode::Start) {
            let (key, _) = item?;
            if !std::str::from_utf8(&key).map(|k| live.contains(k)).unwrap_or(false) {
                batch.delete_cf(cf_accounts, &key);
            }
        }

        batch.put_cf(cf_config, CONFIG_KEY, serde_json::to_vec(&snapshot.config)?);

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(accounts = snapshot.users.len(), "Snapshot saved to RocksDB");
        Ok(())
    }
}

/// Single JSON document store
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the document at `path`, creating its directory if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    /// Path of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::new());
        }

        let content = fs::read(&self.path)?;
        let snapshot: Snapshot = serde_json::from_slice(&content)?;
        tracing::debug!(accounts = snapshot.users.len(), path = ?self.path, "Snapshot loaded");
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();

        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(Error::Storage(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        tracing::debug!(accounts = snapshot.users.len(), path = ?self.path, "Snapshot saved");
        Ok(())
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    snapshot: RwLock<Option<Snapshot>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent save fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.read().clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Storage("save rejected by memory store".to_string()));
        }
        *self.snapshot.write() = Some(snapshot.clone());
        Ok(())
    }
}
