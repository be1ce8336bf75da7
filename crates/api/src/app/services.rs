//! Shared application state handed to every handler.

use std::sync::Arc;

use catalog_auth::{PasswordHasher, TokenService};
use catalog_infra::{AppConfig, CatalogStore, Services};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, config: &AppConfig) -> Self {
        Self {
            services: Services::new(store, PasswordHasher::new(config.bcrypt_cost)),
            tokens: Arc::new(TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl)),
        }
    }
}
