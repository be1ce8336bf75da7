//! Users domain module.
//!
//! Account records, the inputs that create/change them, and field validation.
//! No IO, no HTTP, no storage: hashing and persistence live in other crates.

pub mod email;
pub mod user;

pub use email::validate_email;
pub use user::{NewUser, User, UserChanges, UserDraft, UserPatch, UserView};
