//! Infrastructure layer: storage backends, configuration and application services.

pub mod config;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use services::{ItemWithOwner, ItemsService, Services, UsersService};
pub use store::{CatalogStore, InMemoryStore, ItemFilter, PostgresStore, StoreError, StoreResult, build_store};
