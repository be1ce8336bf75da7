use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, debug, info, info_span};

use catalog_auth::TokenService;
use catalog_infra::UsersService;

use crate::app::errors;
use crate::context::CurrentUser;

const INVALID_CREDENTIALS: &str = "could not validate credentials";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub users: UsersService,
}

/// Resolve the bearer token to a stored user and attach it as [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).ok_or_else(|| errors::unauthorized("not authenticated"))?;

    let claims = state.tokens.validate(token, Utc::now()).map_err(|e| {
        debug!(error = %e, "token rejected");
        errors::unauthorized(INVALID_CREDENTIALS)
    })?;

    let user = state
        .users
        .get_by_username(&claims.sub)
        .await
        .map_err(errors::domain_error_to_response)?
        .ok_or_else(|| {
            debug!(subject = %claims.sub, "token subject no longer exists");
            errors::unauthorized(INVALID_CREDENTIALS)
        })?;

    req.extensions_mut().insert(CurrentUser::new(user));
    Ok(next.run(req).await)
}

/// One span and one completion line per request.
pub async fn request_logging(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let span = info_span!("request", method = %req.method(), path = %req.uri().path());
    let started = Instant::now();

    async move {
        let response = next.run(req).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Bearer   padded ")), Some("padded"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(extract_bearer(&headers("Bearer ")), None);
    }
}
