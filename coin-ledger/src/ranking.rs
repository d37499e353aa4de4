//! Leaderboard query

use crate::types::{AccountId, Snapshot};
use serde::{Deserialize, Serialize};

/// Default leaderboard length
pub const DEFAULT_TOP_N: usize = 10;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    /// 1-based position
    pub rank: usize,
    /// Account
    pub account: AccountId,
    /// Its balance
    pub balance: u64,
}

/// Up to `n` accounts by balance, richest first
///
/// Equal balances keep account creation order. An empty ledger yields an
/// empty list.
pub fn top(snapshot: &Snapshot, n: usize) -> Vec<RankEntry> {
    let mut accounts: Vec<_> = snapshot.users.iter().collect();
    accounts.sort_by(|(a_id, a), (b_id, b)| {
        b.balance
            .cmp(&a.balance)
            .then(a.opened_seq.cmp(&b.opened_seq))
            .then_with(|| a_id.cmp(b_id))
    });

    accounts
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (id, account))| RankEntry {
            rank: i + 1,
            account: id.clone(),
            balance: account.balance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::set_balance;

    #[test]
    fn test_empty_ledger() {
        assert!(top(&Snapshot::new(), DEFAULT_TOP_N).is_empty());
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let mut snapshot = Snapshot::new();
        for (i, balance) in [300u64, 1200, 50, 900, 700].iter().enumerate() {
            set_balance(&mut snapshot, &AccountId::new(format!("u{}", i)), *balance);
        }

        let board = top(&snapshot, 3);
        let balances: Vec<u64> = board.iter().map(|e| e.balance).collect();
        assert_eq!(balances, vec![1200, 900, 700]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].account, AccountId::new("u1"));
    }

    #[test]
    fn test_ties_keep_creation_order() {
        let mut snapshot = Snapshot::new();
        // Names chosen so that lexicographic order disagrees with creation order
        for name in ["zed", "mia", "abe"] {
            set_balance(&mut snapshot, &AccountId::new(name), 1000);
        }

        let names: Vec<String> = top(&snapshot, 10)
            .into_iter()
            .map(|e| e.account.to_string())
            .collect();
        assert_eq!(names, vec!["zed", "mia", "abe"]);
    }

    #[test]
    fn test_ties_follow_legacy_document_order() {
        let doc = r#"{
            "users": {
                "zed": { "balance": 1000, "last_daily": null },
                "abe": { "balance": 1000, "last_daily": null }
            },
            "config": { "fee_rate": 0.05, "admin_ids": [] }
        }"#;
        let snapshot: Snapshot = serde_json::from_str(doc).unwrap();

        let names: Vec<String> = top(&snapshot, 10)
            .into_iter()
            .map(|e| e.account.to_string())
            .collect();
        assert_eq!(names, vec!["zed", "abe"]);
    }
}
