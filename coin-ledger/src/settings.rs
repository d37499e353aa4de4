//! Ledger settings changes (fee rate, admin list)
//!
//! Two privilege tiers gate these: the platform-level administrator
//! capability (asserted by the dispatcher, gates `add_admin`) and the
//! application-level admin list (gates `set_fee_rate`). They are checked
//! independently; adding an admin never makes the caller one.

use crate::{
    accounts::{self, require_admin, AdminOutcome},
    error::{Error, Privilege, Result},
    types::{AccountId, Snapshot},
};

/// Capability the dispatcher asserts for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformRole {
    /// Ordinary member
    #[default]
    Member,
    /// Platform-level administrator
    Administrator,
}

/// Check a fee rate without applying it
pub fn validate_fee_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(Error::FeeRateOutOfRange(rate))
    }
}

/// Set the fee rate; `caller` must be an application admin
///
/// Returns the previous rate.
pub fn set_fee_rate(snapshot: &mut Snapshot, caller: &AccountId, rate: f64) -> Result<f64> {
    require_admin(snapshot, caller)?;
    validate_fee_rate(rate)?;

    let previous = std::mem::replace(&mut snapshot.config.fee_rate, rate);
    tracing::info!(caller = %caller, previous, rate, "Fee rate changed");
    Ok(previous)
}

/// Add `target` to the admin list; needs the platform administrator role
pub fn add_admin(
    snapshot: &mut Snapshot,
    caller: &AccountId,
    role: PlatformRole,
    target: &AccountId,
) -> Result<AdminOutcome> {
    if role != PlatformRole::Administrator {
        return Err(Error::PermissionDenied {
            account: caller.clone(),
            required: Privilege::PlatformAdministrator,
        });
    }

    let outcome = accounts::add_admin(snapshot, target);
    if outcome == AdminOutcome::Added {
        tracing::info!(caller = %caller, admin = %target, "Admin added");
    }
    Ok(outcome)
}
