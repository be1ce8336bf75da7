use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod items;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
///
/// Collection paths answer with and without the trailing slash.
pub fn public() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/users", post(users::register).get(users::list_users))
        .route("/users/", post(users::register).get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/items", get(items::list_items))
        .route("/items/", get(items::list_items))
        .route("/items/:id", get(items::get_item))
}

/// Endpoints that require a `CurrentUser`; the caller layers auth on top.
pub fn protected() -> Router {
    Router::new()
        .route("/users/me", get(users::me))
        .route("/users/:id", axum::routing::put(users::update_user).delete(users::delete_user))
        .route("/items", post(items::create_item))
        .route("/items/", post(items::create_item))
        .route("/items/my-items", get(items::my_items))
        .route("/items/:id", axum::routing::put(items::update_item).delete(items::delete_item))
}
