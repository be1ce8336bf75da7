use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use catalog_core::{ItemId, Page, UserId};
use catalog_items::{Item, ItemDraft};
use catalog_users::{User, UserDraft};

use super::{CatalogStore, ItemFilter, StoreError, StoreResult, UniqueField};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    items: BTreeMap<ItemId, Item>,
    last_user_id: i64,
    last_item_id: i64,
}

impl Tables {
    /// Uniqueness check, ignoring the record being replaced (if any).
    /// Email is reported first, whichever users the clashes are with.
    fn ensure_unique(&self, email: &str, username: &str, except: Option<UserId>) -> StoreResult<()> {
        let mut others = self.users.values().filter(|u| Some(u.id) != except);
        if others.clone().any(|u| u.email == email) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }
        if others.any(|u| u.username == username) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        Ok(())
    }
}

/// In-memory store for tests/dev.
///
/// All tables sit behind one lock, so check-and-write sequences (uniqueness,
/// owner existence, cascade delete) are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_user(&self, draft: UserDraft) -> StoreResult<User> {
        let mut tables = self.write()?;
        tables.ensure_unique(&draft.email, &draft.username, None)?;

        tables.last_user_id += 1;
        let user = draft.into_user(UserId::new(tables.last_user_id));
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.username == username).cloned())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let tables = self.read()?;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn list_users(&self, page: Page) -> StoreResult<Vec<User>> {
        Ok(page.apply(self.read()?.users.values()).cloned().collect())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        tables.ensure_unique(&user.email, &user.username, Some(user.id))?;

        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let mut tables = self.write()?;
        let removed = tables.users.remove(&id);
        if removed.is_some() {
            tables.items.retain(|_, item| item.owner_id != id);
        }
        Ok(removed)
    }

    async fn insert_item(&self, draft: ItemDraft) -> StoreResult<Item> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&draft.owner_id) {
            return Err(StoreError::MissingReference("user"));
        }

        tables.last_item_id += 1;
        let item = draft.into_item(ItemId::new(tables.last_item_id));
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn item_by_id(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter, page: Page) -> StoreResult<Vec<Item>> {
        let tables = self.read()?;
        let matching = tables.items.values().filter(|item| filter.matches(item));
        Ok(page.apply(matching).cloned().collect())
    }

    async fn update_item(&self, item: &Item) -> StoreResult<Item> {
        let mut tables = self.write()?;
        let stored = tables.items.get_mut(&item.id).ok_or(StoreError::NotFound)?;

        stored.title = item.title.clone();
        stored.description = item.description.clone();
        stored.price = item.price;
        stored.is_available = item.is_available;
        stored.updated_at = item.updated_at;
        Ok(stored.clone())
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.write()?.items.remove(&id))
    }
}
