use chrono::{DateTime, Utc};
use serde::Deserialize;

use catalog_core::{DomainError, DomainResult, ItemId, UserId};

/// A stored catalog item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_available: bool,
    /// Set from the creator at insert time; never reassigned.
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Apply validated changes and stamp `updated_at`. `owner_id` is untouched.
    pub fn apply(&mut self, changes: ItemChanges, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(is_available) = changes.is_available {
            self.is_available = is_available;
        }
        self.updated_at = Some(now);
    }
}

/// Creation input. The owner comes from the authenticated caller, not the body.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl NewItem {
    pub fn validate(&self) -> DomainResult<()> {
        validate_title(&self.title)?;
        validate_price(self.price)
    }

    pub fn into_draft(self, owner_id: UserId, now: DateTime<Utc>) -> ItemDraft {
        ItemDraft {
            title: self.title,
            description: self.description,
            price: self.price,
            is_available: true,
            owner_id,
            created_at: now,
        }
    }
}

/// An item awaiting an id from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_available: bool,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl ItemDraft {
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            is_available: self.is_available,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// Partial update input; absent fields stay unchanged, `null` clears the
/// nullable ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemChanges {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "catalog_core::nullable::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "catalog_core::nullable::deserialize")]
    pub price: Option<Option<f64>>,
    pub is_available: Option<bool>,
}

impl ItemChanges {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_price(self.price.flatten())
    }
}

fn validate_title(title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title must not be blank"));
    }
    Ok(())
}

fn validate_price(price: Option<f64>) -> DomainResult<()> {
    match price {
        Some(p) if !p.is_finite() => Err(DomainError::validation("price must be a finite number")),
        Some(p) if p < 0.0 => Err(DomainError::validation("price must not be negative")),
        _ => Ok(()),
    }
}
