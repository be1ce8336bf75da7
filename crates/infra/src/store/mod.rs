//! Persistence boundary for users and items.
//!
//! The store is the authority for uniqueness (email, username) and for the
//! item → owner reference; services only pre-check for friendlier errors.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use catalog_core::{DomainError, ItemId, Page, UserId};
use catalog_items::{Item, ItemDraft, ItemSearch};
use catalog_users::{User, UserDraft};

use crate::config::DatabaseConfig;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Unique user attributes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl core::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UniqueField::Email => f.write_str("email"),
            UniqueField::Username => f.write_str("username"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(UniqueField),

    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),

    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Convert with a resource name for `NotFound`/`MissingReference`.
    pub fn into_domain(self, resource: &'static str) -> DomainError {
        match self {
            StoreError::Conflict(UniqueField::Email) => DomainError::conflict("email already registered"),
            StoreError::Conflict(UniqueField::Username) => DomainError::conflict("username already taken"),
            StoreError::MissingReference(what) => DomainError::not_found(what),
            StoreError::NotFound => DomainError::not_found(resource),
            StoreError::Backend(msg) => DomainError::internal(msg),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        err.into_domain("record")
    }
}

/// Item listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub owner: Option<UserId>,
    pub search: Option<ItemSearch>,
}

impl ItemFilter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            search: None,
        }
    }

    pub fn search(search: Option<ItemSearch>) -> Self {
        Self { owner: None, search }
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.owner.is_none_or(|owner| item.owner_id == owner)
            && self.search.as_ref().is_none_or(|s| s.matches(item))
    }
}

/// Storage for users and their items.
///
/// Every method is atomic on its own; listings are ordered by id ascending.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fails with `Conflict` when email or username is taken.
    async fn insert_user(&self, draft: UserDraft) -> StoreResult<User>;
    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;
    async fn list_users(&self, page: Page) -> StoreResult<Vec<User>>;
    /// Replace the stored record; `NotFound` if it vanished, `Conflict` on a taken email/username.
    async fn update_user(&self, user: &User) -> StoreResult<User>;
    /// Remove the user together with every item they own.
    async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Fails with `MissingReference("user")` when the owner does not exist.
    async fn insert_item(&self, draft: ItemDraft) -> StoreResult<Item>;
    async fn item_by_id(&self, id: ItemId) -> StoreResult<Option<Item>>;
    async fn list_items(&self, filter: &ItemFilter, page: Page) -> StoreResult<Vec<Item>>;
    /// Replace title/description/price/availability; `owner_id` is never written.
    async fn update_item(&self, item: &Item) -> StoreResult<Item>;
    async fn delete_item(&self, id: ItemId) -> StoreResult<Option<Item>>;
}

/// Build the configured store: Postgres when a database is configured,
/// otherwise a process-local in-memory store.
pub async fn build_store(database: Option<&DatabaseConfig>) -> StoreResult<Arc<dyn CatalogStore>> {
    match database {
        Some(db) => {
            let store = PostgresStore::connect(db).await?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_map_to_field_specific_messages() {
        assert_eq!(
            DomainError::from(StoreError::Conflict(UniqueField::Email)),
            DomainError::conflict("email already registered")
        );
        assert_eq!(
            DomainError::from(StoreError::Conflict(UniqueField::Username)),
            DomainError::conflict("username already taken")
        );
    }

    #[test]
    fn backend_failures_become_internal() {
        let err: DomainError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[test]
    fn not_found_uses_given_resource() {
        assert_eq!(StoreError::NotFound.into_domain("item"), DomainError::not_found("item"));
    }
}
