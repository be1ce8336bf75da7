use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use catalog_core::{Page, UserId};
use catalog_users::{NewUser, UserChanges, UserView};

use crate::app::errors;
use crate::app::services::AppState;
use crate::context::CurrentUser;

pub async fn register(
    Extension(state): Extension<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(r) => return errors::json_rejection(r),
    };

    match state.services.users.register(body).await {
        Ok(user) => (StatusCode::CREATED, Json(UserView::from(user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(state): Extension<AppState>,
    page: Result<Query<Page>, QueryRejection>,
) -> axum::response::Response {
    let Query(page) = match page {
        Ok(p) => p,
        Err(r) => return errors::query_rejection(r),
    };

    match state.services.users.list(page).await {
        Ok(users) => Json(users.iter().map(UserView::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> axum::response::Response {
    Json(UserView::from(current.user())).into_response()
}

pub async fn get_user(
    Extension(state): Extension<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_user_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.services.users.get(id).await {
        Ok(user) => Json(UserView::from(user)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<UserChanges>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_user_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(r) => return errors::json_rejection(r),
    };

    match state.services.users.update(id, body, &current.principal()).await {
        Ok(user) => Json(UserView::from(user)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_user_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.services.users.delete(id, &current.principal()).await {
        Ok(user) => Json(UserView::from(user)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn parse_user_id(raw: Result<Path<String>, PathRejection>) -> Result<UserId, axum::response::Response> {
    let Path(raw) = raw.map_err(errors::path_rejection)?;
    raw.parse::<UserId>().map_err(errors::domain_error_to_response)
}
