use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use catalog_auth::{Principal, ensure_owner};
use catalog_core::{DomainError, DomainResult, ItemId, Page, UserId};
use catalog_items::{Item, ItemChanges, ItemSearch, NewItem};
use catalog_users::User;

use crate::store::{CatalogStore, ItemFilter};

/// An item together with its owner, for read endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemWithOwner {
    pub item: Item,
    /// `None` only if the owner disappeared between the two reads.
    pub owner: Option<User>,
}

#[derive(Clone)]
pub struct ItemsService {
    store: Arc<dyn CatalogStore>,
}

impl ItemsService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(caller = %principal))]
    pub async fn create(&self, input: NewItem, principal: &Principal) -> DomainResult<Item> {
        input.validate()?;
        let item = self
            .store
            .insert_item(input.into_draft(principal.user_id, Utc::now()))
            .await
            .map_err(|e| e.into_domain("item"))?;

        info!(item_id = %item.id, "item created");
        Ok(item)
    }

    /// All items, optionally narrowed by a case-insensitive title/description search.
    pub async fn list(&self, page: Page, search: Option<&str>) -> DomainResult<Vec<ItemWithOwner>> {
        let filter = ItemFilter::search(ItemSearch::new(search));
        let items = self.store.list_items(&filter, page).await?;
        self.with_owners(items).await
    }

    pub async fn list_by_owner(&self, principal: &Principal, page: Page) -> DomainResult<Vec<Item>> {
        Ok(self
            .store
            .list_items(&ItemFilter::owned_by(principal.user_id), page)
            .await?)
    }

    pub async fn get(&self, id: ItemId) -> DomainResult<ItemWithOwner> {
        let item = self.find(id).await?;
        let owner = self.store.user_by_id(item.owner_id).await?;
        Ok(ItemWithOwner { item, owner })
    }

    #[instrument(skip(self, changes), fields(caller = %principal))]
    pub async fn update(&self, id: ItemId, changes: ItemChanges, principal: &Principal) -> DomainResult<Item> {
        let mut item = self.find(id).await?;
        ensure_owner(principal, id, item.owner_id)?;
        changes.validate()?;

        item.apply(changes, Utc::now());
        let updated = self
            .store
            .update_item(&item)
            .await
            .map_err(|e| e.into_domain("item"))?;

        info!(item_id = %updated.id, "item updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(caller = %principal))]
    pub async fn delete(&self, id: ItemId, principal: &Principal) -> DomainResult<Item> {
        let item = self.find(id).await?;
        ensure_owner(principal, id, item.owner_id)?;

        let deleted = self
            .store
            .delete_item(id)
            .await?
            .ok_or(DomainError::not_found("item"))?;
        info!(item_id = %deleted.id, "item deleted");
        Ok(deleted)
    }

    async fn find(&self, id: ItemId) -> DomainResult<Item> {
        self.store
            .item_by_id(id)
            .await?
            .ok_or(DomainError::not_found("item"))
    }

    async fn with_owners(&self, items: Vec<Item>) -> DomainResult<Vec<ItemWithOwner>> {
        let mut owner_ids: Vec<UserId> = items.iter().map(|i| i.owner_id).collect();
        owner_ids.sort();
        owner_ids.dedup();

        let owners: HashMap<UserId, User> = self
            .store
            .users_by_ids(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| {
                let owner = owners.get(&item.owner_id).cloned();
                ItemWithOwner { item, owner }
            })
            .collect())
    }
}
