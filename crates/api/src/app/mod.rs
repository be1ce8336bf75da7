//! HTTP API application wiring (Axum router + shared state).
//!
//! - `services.rs`: `AppState`, built once from config and the store
//! - `routes/`: HTTP handlers, one file per resource
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppState;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(state: AppState) -> Router {
    let auth_state = middleware::AuthState {
        tokens: state.tokens.clone(),
        users: state.services.users.clone(),
    };

    // Auth runs per matched route, so public methods on a shared path stay open.
    let protected = routes::protected().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(Extension(state)),
        )
}
