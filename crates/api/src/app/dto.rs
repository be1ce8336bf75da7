//! Request/response DTOs and JSON mapping helpers.

use axum::extract::{Form, FromRequest, Json, Request};
use axum::http::header;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{ItemId, Page, UserId};
use catalog_infra::ItemWithOwner;
use catalog_items::Item;
use catalog_users::{User, UserView};

use crate::app::errors;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Accepts login credentials as JSON or as an urlencoded form.
#[derive(Debug, Clone)]
pub struct LoginCredentials(pub LoginRequest);

#[axum::async_trait]
impl<S> FromRequest<S> for LoginCredentials
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(body) = Form::<LoginRequest>::from_request(req, state).await.map_err(|rejection| {
                errors::json_error(rejection.status(), "invalid_body", rejection.body_text())
            })?;
            return Ok(Self(body));
        }

        let Json(body) = Json::<LoginRequest>::from_request(req, state)
            .await
            .map_err(errors::json_rejection)?;
        Ok(Self(body))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// `?skip=&limit=&search=`; pagination defaults match [`Page::default`].
#[derive(Debug, Clone, Deserialize)]
pub struct ItemListQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

impl ItemListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

fn default_limit() -> u64 {
    Page::DEFAULT_LIMIT
}

/// Serialized item with its owner expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_available: bool,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub owner: Option<UserView>,
}

impl ItemView {
    pub fn new(item: Item, owner: Option<&User>) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            price: item.price,
            is_available: item.is_available,
            owner_id: item.owner_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
            owner: owner.map(UserView::from),
        }
    }
}

impl From<ItemWithOwner> for ItemView {
    fn from(entry: ItemWithOwner) -> Self {
        Self::new(entry.item, entry.owner.as_ref())
    }
}
