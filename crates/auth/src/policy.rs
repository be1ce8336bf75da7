//! Ownership / self-service authorization.
//!
//! - No IO
//! - No panics
//! - Callers check existence first; these functions only decide ownership.

use thiserror::Error;

use catalog_core::{DomainError, ItemId, UserId};

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user {caller} does not own item {item_id}")]
    NotOwner { caller: UserId, item_id: ItemId },

    #[error("user {caller} cannot modify user {target}")]
    NotSelf { caller: UserId, target: UserId },
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        // The detailed variant is for logs; callers only learn they lack rights.
        DomainError::forbidden("not enough permissions")
    }
}

/// Item mutations: the caller must be the item's owner.
pub fn ensure_owner(principal: &Principal, item_id: ItemId, owner_id: UserId) -> Result<(), AuthzError> {
    if principal.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::NotOwner {
            caller: principal.user_id,
            item_id,
        })
    }
}

/// User mutations: the caller may only touch their own record.
pub fn ensure_self(principal: &Principal, target: UserId) -> Result<(), AuthzError> {
    if principal.user_id == target {
        Ok(())
    } else {
        Err(AuthzError::NotSelf {
            caller: principal.user_id,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Principal {
        Principal::new(UserId::new(1), "alice")
    }

    #[test]
    fn owner_may_mutate_item() {
        assert!(ensure_owner(&alice(), ItemId::new(10), UserId::new(1)).is_ok());
    }

    #[test]
    fn non_owner_is_rejected() {
        let err = ensure_owner(&alice(), ItemId::new(10), UserId::new(2)).unwrap_err();
        assert_eq!(
            err,
            AuthzError::NotOwner {
                caller: UserId::new(1),
                item_id: ItemId::new(10)
            }
        );
        assert!(matches!(DomainError::from(err), DomainError::Forbidden(_)));
    }

    #[test]
    fn self_service_only() {
        assert!(ensure_self(&alice(), UserId::new(1)).is_ok());
        assert!(matches!(
            ensure_self(&alice(), UserId::new(3)),
            Err(AuthzError::NotSelf { .. })
        ));
    }
}
