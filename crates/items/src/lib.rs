//! Items domain module.
//!
//! Catalog records owned by a single user, their create/update inputs and the
//! substring search filter. Pure domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod search;

pub use item::{Item, ItemChanges, ItemDraft, NewItem};
pub use search::ItemSearch;
