use axum::{extract::Extension, response::IntoResponse, Json};
use chrono::Utc;
use tracing::info;

use crate::app::dto::{LoginCredentials, TokenResponse};
use crate::app::errors;
use crate::app::services::AppState;

pub async fn login(
    Extension(state): Extension<AppState>,
    LoginCredentials(body): LoginCredentials,
) -> axum::response::Response {
    let user = match state.services.users.authenticate(&body.username, &body.password).await {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let issued = match state.tokens.issue(&user.username, Utc::now()) {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e.into()),
    };

    info!(user_id = %user.id, "login succeeded");
    Json(TokenResponse::bearer(issued.token)).into_response()
}
