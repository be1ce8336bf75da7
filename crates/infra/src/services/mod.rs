//! Application services: orchestrate validation, policy checks and storage.

pub mod items;
pub mod users;

use std::sync::Arc;

use catalog_auth::PasswordHasher;

use crate::store::CatalogStore;

pub use items::{ItemWithOwner, ItemsService};
pub use users::UsersService;

/// Everything the HTTP layer needs, sharing one store.
#[derive(Clone)]
pub struct Services {
    pub users: UsersService,
    pub items: ItemsService,
}

impl Services {
    pub fn new(store: Arc<dyn CatalogStore>, hasher: PasswordHasher) -> Self {
        Self {
            users: UsersService::new(store.clone(), hasher),
            items: ItemsService::new(store),
        }
    }
}
