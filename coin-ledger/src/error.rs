//! Error types for the ledger

use crate::types::AccountId;
use std::fmt;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Privilege tier required by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Platform-level administrator capability, asserted by the dispatcher
    PlatformAdministrator,
    /// Application-level admin (member of `admin_ids`)
    LedgerAdmin,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privilege::PlatformAdministrator => write!(f, "platform administrator"),
            Privilege::LedgerAdmin => write!(f, "ledger admin"),
        }
    }
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing was mutated
    Validation,
    /// Caller lacks the required privilege tier; nothing was mutated
    Permission,
    /// Durable read/write failed; the operation did not take effect
    Storage,
    /// Actor, timeout or configuration problem
    Internal,
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Amount or stake was zero
    #[error("Amount must be positive")]
    NonPositiveAmount,

    /// A two-party wager named the caller as opponent
    #[error("Cannot wager against yourself")]
    SelfWager,

    /// Odd/even declaration was neither odd nor even
    #[error("Invalid choice: {0} (expected odd or even)")]
    InvalidChoice(String),

    /// Fee rate outside [0, 1]
    #[error("Fee rate {0} is out of range (expected 0.0 to 1.0)")]
    FeeRateOutOfRange(f64),

    /// Balance does not cover the amount
    #[error("Insufficient funds: {account} has {balance}, needs {required}")]
    InsufficientFunds {
        /// Account that came up short
        account: AccountId,
        /// Its balance at the time of the check
        balance: u64,
        /// Amount the operation required
        required: u64,
    },

    /// Malformed command argument or arithmetic overflow
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Caller lacks a privilege tier
    #[error("Permission denied: {account} is not a {required}")]
    PermissionDenied {
        /// Caller
        account: AccountId,
        /// Tier the operation requires
        required: Privilege,
    },

    /// Storage error (RocksDB, file store)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Operation exceeded its deadline
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify the error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NonPositiveAmount
            | Error::SelfWager
            | Error::InvalidChoice(_)
            | Error::FeeRateOutOfRange(_)
            | Error::InsufficientFunds { .. }
            | Error::InvalidArgument(_) => ErrorKind::Validation,
            Error::PermissionDenied { .. } => ErrorKind::Permission,
            Error::Storage(_) | Error::Serialization(_) | Error::Io(_) => ErrorKind::Storage,
            Error::Concurrency(_) | Error::Timeout(_) | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// True for validation failures
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::SelfWager.kind(), ErrorKind::Validation);
        assert_eq!(Error::FeeRateOutOfRange(1.5).kind(), ErrorKind::Validation);
        assert_eq!(
            Error::PermissionDenied {
                account: AccountId::new("42"),
                required: Privilege::LedgerAdmin,
            }
            .kind(),
            ErrorKind::Permission
        );
        assert_eq!(Error::Storage("disk full".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Timeout(50).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = Error::InsufficientFunds {
            account: AccountId::new("alice"),
            balance: 10,
            required: 100,
        };
        assert_eq!(err.to_string(), "Insufficient funds: alice has 10, needs 100");
    }
}
