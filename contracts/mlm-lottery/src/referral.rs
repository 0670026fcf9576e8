use cosmwasm_std::{Addr, StdResult, Storage};

use crate::error::ContractError;
use crate::state::{UserInfo, USERS, USER_IDS};

/// Deepest ancestor level that takes part in the prize cascade.
pub const MAX_REFERRAL_DEPTH: usize = 3;

/// Decide which referrer a buyer ends up with.
///
/// `referrer_id` 0 means the buyer did not ask for one: new users fall back to
/// the administrator and existing users keep what they have. A non-zero id
/// must be registered and must not be the buyer. Once set, a referrer can
/// never be replaced, so naming anyone else is a conflict.
pub fn resolve_referrer(
    storage: &dyn Storage,
    admin: &Addr,
    buyer: &Addr,
    existing: Option<&UserInfo>,
    referrer_id: u64,
) -> Result<Option<Addr>, ContractError> {
    let requested = if referrer_id == 0 {
        None
    } else {
        let candidate = USER_IDS
            .may_load(storage, referrer_id)?
            .ok_or(ContractError::InvalidReferrer {
                reason: format!("unknown referrer id {}", referrer_id),
            })?;
        if candidate == *buyer {
            return Err(ContractError::InvalidReferrer {
                reason: "can not refer yourself".to_string(),
            });
        }
        Some(candidate)
    };

    match (existing, requested) {
        (Some(user), Some(candidate)) => {
            if user.referrer.as_ref() != Some(&candidate) {
                return Err(ContractError::ReferrerConflict);
            }
            Ok(user.referrer.clone())
        }
        (Some(user), None) => Ok(user.referrer.clone()),
        (None, Some(candidate)) => Ok(Some(candidate)),
        (None, None) => Ok(Some(admin.clone())),
    }
}

/// Walk up to `depth` referrers above `user`, nearest first.
///
/// Stops at the administrator, who never receives cascade payouts, and at any
/// account without a referrer.
pub fn ancestors(
    storage: &dyn Storage,
    admin: &Addr,
    user: &Addr,
    depth: usize,
) -> StdResult<Vec<Addr>> {
    let mut chain = Vec::with_capacity(depth);
    let mut current = user.clone();

    for _ in 0..depth {
        let parent = match USERS.may_load(storage, &current)?.and_then(|u| u.referrer) {
            Some(parent) => parent,
            None => break,
        };
        if parent == *admin {
            break;
        }
        chain.push(parent.clone());
        current = parent;
    }

    Ok(chain)
}

/// The referrer that should be paid for a purchase, or `None` when it is the
/// administrator.
pub fn payable_referrer(admin: &Addr, referrer: Option<&Addr>) -> Option<Addr> {
    referrer.filter(|r| *r != admin).cloned()
}
