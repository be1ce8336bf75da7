use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use catalog_auth::{PasswordHasher, Principal, ensure_self};
use catalog_core::{DomainError, DomainResult, Page, UserId};
use catalog_users::{NewUser, User, UserChanges};

use crate::store::CatalogStore;

/// Registration, login and self-service account management.
#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn CatalogStore>,
    hasher: PasswordHasher,
    /// Digest at the configured cost, verified against when the username is unknown.
    decoy_hash: Arc<OnceCell<String>>,
}

impl UsersService {
    pub fn new(store: Arc<dyn CatalogStore>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            hasher,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Email is checked before username so callers get a stable message when both clash.
    #[instrument(skip_all, fields(username = %input.username))]
    pub async fn register(&self, input: NewUser) -> DomainResult<User> {
        input.validate()?;

        if self.store.user_by_email(&input.email).await?.is_some() {
            return Err(DomainError::conflict("email already registered"));
        }
        if self.store.user_by_username(&input.username).await?.is_some() {
            return Err(DomainError::conflict("username already taken"));
        }

        let password_hash = self.hash_password(input.password.clone()).await?;
        let user = self
            .store
            .insert_user(input.into_draft(password_hash, Utc::now()))
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown username and wrong password fail with the same error and
    /// both pay for one bcrypt verification.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> DomainResult<User> {
        let Some(user) = self.store.user_by_username(username).await? else {
            let decoy = self
                .decoy_hash
                .get_or_try_init(|| self.hash_password("decoy-password".to_string()))
                .await?
                .clone();
            self.verify_password(password.to_string(), decoy).await?;
            warn!("login failed");
            return Err(invalid_credentials());
        };

        if !self.verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!("login failed");
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    pub async fn list(&self, page: Page) -> DomainResult<Vec<User>> {
        Ok(self.store.list_users(page).await?)
    }

    pub async fn get(&self, id: UserId) -> DomainResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or(DomainError::not_found("user"))
    }

    pub async fn get_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self.store.user_by_username(username).await?)
    }

    #[instrument(skip(self, changes), fields(caller = %principal))]
    pub async fn update(&self, id: UserId, changes: UserChanges, principal: &Principal) -> DomainResult<User> {
        let mut user = self.get(id).await?;
        ensure_self(principal, id)?;
        changes.validate()?;

        if let Some(email) = changes.email.as_deref().filter(|e| *e != user.email) {
            if self.taken_by_other(self.store.user_by_email(email).await?, id) {
                return Err(DomainError::conflict("email already registered"));
            }
        }
        if let Some(username) = changes.username.as_deref().filter(|u| *u != user.username) {
            if self.taken_by_other(self.store.user_by_username(username).await?, id) {
                return Err(DomainError::conflict("username already taken"));
            }
        }

        let (mut patch, password) = changes.into_patch();
        if let Some(password) = password {
            patch.password_hash = Some(self.hash_password(password).await?);
        }
        user.apply(patch, Utc::now());

        let updated = self
            .store
            .update_user(&user)
            .await
            .map_err(|e| e.into_domain("user"))?;
        info!(user_id = %updated.id, "user updated");
        Ok(updated)
    }

    /// Deleting an account also deletes every item it owns.
    #[instrument(skip(self), fields(caller = %principal))]
    pub async fn delete(&self, id: UserId, principal: &Principal) -> DomainResult<User> {
        self.get(id).await?;
        ensure_self(principal, id)?;

        let deleted = self
            .store
            .delete_user(id)
            .await?
            .ok_or(DomainError::not_found("user"))?;
        info!(user_id = %deleted.id, "user deleted");
        Ok(deleted)
    }

    fn taken_by_other(&self, found: Option<User>, id: UserId) -> bool {
        found.is_some_and(|other| other.id != id)
    }

    async fn hash_password(&self, password: String) -> DomainResult<String> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    async fn verify_password(&self, password: String, hash: String) -> DomainResult<bool> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| DomainError::internal(format!("password verification task failed: {e}")))
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::unauthorized("incorrect username or password")
}
