//! Coin Ledger
//!
//! Persistent virtual-currency ledger for a chat community: balances,
//! transfers, two-player wagers with a burned house fee, an admin-only
//! weighted draw, and a leaderboard.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor owns every mutation, so concurrent
//!   commands never lose updates
//! - **Load-Mutate-Save**: each operation reads the snapshot, mutates it
//!   and persists it atomically before replying
//! - **Pluggable Storage**: RocksDB, a JSON document, or memory
//!
//! # Invariants
//!
//! - Transfers conserve total supply
//! - A settled wager lowers total supply by exactly its fee
//! - Rejected operations leave the snapshot untouched
//! - Balances never go negative

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod accounts;
pub mod actor;
pub mod commands;
pub mod config;
pub mod error;
pub mod fee;
pub mod ledger;
pub mod metrics;
pub mod ranking;
pub mod settings;
pub mod storage;
pub mod types;
pub mod wager;

// Re-exports
pub use commands::{dispatch, Command, Reply};
pub use config::Config;
pub use error::{Error, ErrorKind, Privilege, Result};
pub use ledger::Ledger;
pub use settings::PlatformRole;
pub use types::{Account, AccountId, LedgerSettings, Snapshot};
pub use wager::{Parity, WagerOutcome};
