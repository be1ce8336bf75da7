use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use catalog_core::{ItemId, Page};
use catalog_items::{ItemChanges, NewItem};

use crate::app::dto::{ItemListQuery, ItemView};
use crate::app::errors;
use crate::app::services::AppState;
use crate::context::CurrentUser;

pub async fn create_item(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<NewItem>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(r) => return errors::json_rejection(r),
    };

    match state.services.items.create(body, &current.principal()).await {
        Ok(item) => (StatusCode::CREATED, Json(ItemView::new(item, Some(current.user())))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(state): Extension<AppState>,
    query: Result<Query<ItemListQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(r) => return errors::query_rejection(r),
    };

    match state.services.items.list(query.page(), query.search.as_deref()).await {
        Ok(items) => Json(items.into_iter().map(ItemView::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn my_items(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    page: Result<Query<Page>, QueryRejection>,
) -> axum::response::Response {
    let Query(page) = match page {
        Ok(p) => p,
        Err(r) => return errors::query_rejection(r),
    };

    match state.services.items.list_by_owner(&current.principal(), page).await {
        Ok(items) => Json(
            items
                .into_iter()
                .map(|item| ItemView::new(item, Some(current.user())))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(state): Extension<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_item_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.services.items.get(id).await {
        Ok(entry) => Json(ItemView::from(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<ItemChanges>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_item_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(r) => return errors::json_rejection(r),
    };

    match state.services.items.update(id, body, &current.principal()).await {
        Ok(item) => Json(ItemView::new(item, Some(current.user()))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_item_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.services.items.delete(id, &current.principal()).await {
        Ok(item) => Json(ItemView::new(item, Some(current.user()))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn parse_item_id(raw: Result<Path<String>, PathRejection>) -> Result<ItemId, axum::response::Response> {
    let Path(raw) = raw.map_err(errors::path_rejection)?;
    raw.parse::<ItemId>().map_err(errors::domain_error_to_response)
}
