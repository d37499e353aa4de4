//! Core types for the ledger
//!
//! The [`Snapshot`] is the unit of durability: every account plus the
//! ledger settings. Balances are whole coins (`u64`), so a balance below
//! zero is unrepresentable and every debit has to be validated first.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Balance a lazily created account starts with
pub const DEFAULT_STARTING_BALANCE: u64 = 1000;

/// Fee rate of a fresh ledger (5%)
pub const DEFAULT_FEE_RATE: f64 = 0.05;

/// Opaque account identifier (chat platform user id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Older documents stored admin ids as bare integers.
impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = AccountId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an account id string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AccountId, E> {
                Ok(AccountId::new(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<AccountId, E> {
                Ok(AccountId::new(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<AccountId, E> {
                Ok(AccountId::new(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single account record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Coins held
    pub balance: u64,

    /// Reserved for a daily reward; nothing reads or writes it yet
    #[serde(default)]
    pub last_daily: Option<DateTime<Utc>>,

    /// Position in creation order, used to break ranking ties
    #[serde(default)]
    pub opened_seq: u64,
}

impl Account {
    /// Create account with a balance at the given creation ordinal
    pub fn new(balance: u64, opened_seq: u64) -> Self {
        Self {
            balance,
            last_daily: None,
            opened_seq,
        }
    }
}

/// Persisted ledger settings (`config` in the stored document)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Fraction of a stake burned on every settled wager
    pub fee_rate: f64,

    /// Application-level admins, in the order they were added
    #[serde(default)]
    pub admin_ids: Vec<AccountId>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
            admin_ids: Vec::new(),
        }
    }
}

/// Full ledger state at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Accounts by id
    #[serde(default, deserialize_with = "users_in_document_order")]
    pub users: HashMap<AccountId, Account>,

    /// Ledger settings
    #[serde(default)]
    pub config: LedgerSettings,
}

impl Snapshot {
    /// Empty snapshot with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an account without creating it
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.users.get(id)
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u128 {
        self.users.values().map(|a| a.balance as u128).sum()
    }

    /// Insert a new account with `balance` at the end of the creation order
    pub(crate) fn open_account(&mut self, id: &AccountId, balance: u64) -> &mut Account {
        let seq = self
            .users
            .values()
            .map(|a| a.opened_seq + 1)
            .max()
            .unwrap_or(0);
        self.users
            .entry(id.clone())
            .or_insert_with(|| Account::new(balance, seq))
    }
}

/// Read the `users` map, numbering accounts without an `opened_seq` in the
/// order they appear in the document, after any that already carry one
fn users_in_document_order<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<AccountId, Account>, D::Error> {
    #[derive(Deserialize)]
    struct StoredAccount {
        balance: u64,
        #[serde(default)]
        last_daily: Option<DateTime<Utc>>,
        #[serde(default)]
        opened_seq: Option<u64>,
    }

    struct UsersVisitor;

    impl<'de> Visitor<'de> for UsersVisitor {
        type Value = Vec<(AccountId, StoredAccount)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a map of account ids to accounts")
        }

        fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<AccountId, StoredAccount>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    let entries = deserializer.deserialize_map(UsersVisitor)?;
    let mut next_seq = entries
        .iter()
        .filter_map(|(_, stored)| stored.opened_seq)
        .map(|seq| seq + 1)
        .max()
        .unwrap_or(0);

    let mut users = HashMap::with_capacity(entries.len());
    for (id, stored) in entries {
        let opened_seq = match stored.opened_seq {
            Some(seq) => seq,
            None => {
                next_seq += 1;
                next_seq - 1
            }
        };
        users.insert(
            id,
            Account {
                balance: stored.balance,
                last_daily: stored.last_daily,
                opened_seq,
            },
        );
    }
    Ok(users)
}
