//! `catalog-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it hashes
//! passwords, mints/validates bearer tokens and answers ownership questions.

pub mod password;
pub mod policy;
pub mod principal;
pub mod token;

pub use password::{PasswordError, PasswordHasher};
pub use policy::{AuthzError, ensure_owner, ensure_self};
pub use principal::Principal;
pub use token::{AccessToken, JwtClaims, TokenError, TokenService, TokenValidationError, validate_claims};
