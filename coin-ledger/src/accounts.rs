//! Account operations on a snapshot
//!
//! Functions here mutate a [`Snapshot`] in place and never touch storage.
//! Anything that may have created an account or changed a balance leaves
//! the snapshot dirty; the actor persists it before replying.

use crate::{
    error::{Error, Privilege, Result},
    types::{AccountId, Snapshot, DEFAULT_STARTING_BALANCE},
};

/// Result of [`add_admin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// Id was inserted
    Added,
    /// Id was already an admin, nothing changed
    AlreadyAdmin,
}

/// Balance of `id`, opening the account with the starting balance if absent
///
/// Returns `(balance, created)`; `created` means the snapshot must be saved.
pub fn get_balance(snapshot: &mut Snapshot, id: &AccountId) -> (u64, bool) {
    if let Some(account) = snapshot.users.get(id) {
        return (account.balance, false);
    }
    let account = snapshot.open_account(id, DEFAULT_STARTING_BALANCE);
    (account.balance, true)
}

/// Overwrite the balance of `id`
///
/// Does not check anything; callers validate funds before debiting. An
/// unknown account is opened with a zero balance first.
pub fn set_balance(snapshot: &mut Snapshot, id: &AccountId, amount: u64) {
    snapshot.open_account(id, 0).balance = amount;
}

/// Is `id` an application-level admin
pub fn is_admin(snapshot: &Snapshot, id: &AccountId) -> bool {
    snapshot.config.admin_ids.contains(id)
}

/// Add `id` to the admin list
pub fn add_admin(snapshot: &mut Snapshot, id: &AccountId) -> AdminOutcome {
    if is_admin(snapshot, id) {
        return AdminOutcome::AlreadyAdmin;
    }
    snapshot.config.admin_ids.push(id.clone());
    AdminOutcome::Added
}

/// Fail with `PermissionDenied` unless `caller` is an application admin
pub fn require_admin(snapshot: &Snapshot, caller: &AccountId) -> Result<()> {
    if is_admin(snapshot, caller) {
        Ok(())
    } else {
        Err(Error::PermissionDenied {
            account: caller.clone(),
            required: Privilege::LedgerAdmin,
        })
    }
}

/// Balances after a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Sender
    pub from: AccountId,
    /// Receiver
    pub to: AccountId,
    /// Coins moved
    pub amount: u64,
    /// Sender balance afterwards
    pub from_balance: u64,
    /// Receiver balance afterwards
    pub to_balance: u64,
}

/// Move `amount` coins from `from` to `to`
///
/// Sending to yourself is allowed and changes nothing.
pub fn transfer(
    snapshot: &mut Snapshot,
    from: &AccountId,
    to: &AccountId,
    amount: u64,
) -> Result<TransferReceipt> {
    if amount == 0 {
        return Err(Error::NonPositiveAmount);
    }

    let (sender_balance, _) = get_balance(snapshot, from);
    if sender_balance < amount {
        return Err(Error::InsufficientFunds {
            account: from.clone(),
            balance: sender_balance,
            required: amount,
        });
    }

    if from == to {
        return Ok(TransferReceipt {
            from: from.clone(),
            to: to.clone(),
            amount,
            from_balance: sender_balance,
            to_balance: sender_balance,
        });
    }

    let (receiver_balance, _) = get_balance(snapshot, to);
    let credited = receiver_balance
        .checked_add(amount)
        .ok_or_else(|| Error::InvalidArgument(format!("balance of {} would overflow", to)))?;

    set_balance(snapshot, from, sender_balance - amount);
    set_balance(snapshot, to, credited);

    Ok(TransferReceipt {
        from: from.clone(),
        to: to.clone(),
        amount,
        from_balance: sender_balance - amount,
        to_balance: credited,
    })
}

/// Mint `amount` coins into `target`; `caller` must be an admin
///
/// Returns the new balance of `target`.
pub fn grant(
    snapshot: &mut Snapshot,
    caller: &AccountId,
    target: &AccountId,
    amount: u64,
) -> Result<u64> {
    require_admin(snapshot, caller)?;
    if amount == 0 {
        return Err(Error::NonPositiveAmount);
    }

    let (balance, _) = get_balance(snapshot, target);
    let credited = balance
        .checked_add(amount)
        .ok_or_else(|| Error::InvalidArgument(format!("balance of {} would overflow", target)))?;
    set_balance(snapshot, target, credited);
    Ok(credited)
}
