//! Email address shape check.
//!
//! Deliberately structural: one `@`, a non-empty local part, and a dotted
//! domain without empty labels. Deliverability is not our concern.

use catalog_core::{DomainError, DomainResult};

const MAX_LEN: usize = 254;

pub fn validate_email(email: &str) -> DomainResult<()> {
    if email.is_empty() || email.len() > MAX_LEN {
        return Err(DomainError::validation("email must be between 1 and 254 characters"));
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DomainError::validation("email must not contain whitespace"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| DomainError::validation("email must contain '@'"))?;

    if local.is_empty() {
        return Err(DomainError::validation("email local part is empty"));
    }
    if domain.contains('@') {
        return Err(DomainError::validation("email must contain exactly one '@'"));
    }
    if !domain.contains('.') || domain.split('.').any(|label| label.is_empty()) {
        return Err(DomainError::validation("email domain is malformed"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_ordinary_addresses() {
        for ok in ["a@b.co", "first.last+tag@example.com", "x@sub.domain.org"] {
            assert!(validate_email(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@localhost",
            "user@@example.com",
            "user@exa mple.com",
            "user@example..com",
            "user@.example.com",
            "a@b@c.com",
        ] {
            assert!(
                matches!(validate_email(bad), Err(DomainError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    proptest! {
        #[test]
        fn generated_addresses_are_accepted(
            local in "[a-z0-9._+-]{1,32}",
            host in "[a-z0-9-]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{local}@{host}.{tld}");
            prop_assert!(validate_email(&email).is_ok());
        }

        #[test]
        fn addresses_without_at_are_rejected(s in "[a-z0-9.]{0,40}") {
            prop_assert!(validate_email(&s).is_err());
        }
    }
}
