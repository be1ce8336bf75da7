use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use catalog_core::DomainError;

/// JWT claims carried by an access token.
///
/// Timestamps travel as standard `iat`/`exp` seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the username the token was issued to.
    pub sub: String,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, truncated or otherwise undecodable.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Encode(String),
}

impl From<TokenError> for DomainError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(msg) => DomainError::internal(msg),
            TokenError::Malformed(_) | TokenError::Claims(_) => {
                DomainError::unauthorized("could not validate credentials")
            }
        }
    }
}

/// Deterministically validate the claims' time window.
///
/// Signature verification happens in [`TokenService::validate`]; this only
/// looks at timestamps, with no leeway.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// A freshly minted bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates HS256 bearer tokens.
///
/// The secret is fixed for the lifetime of the service; changing it
/// invalidates every outstanding token.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, subject: &str, now: DateTime<Utc>) -> Result<AccessToken, TokenError> {
        let claims = JwtClaims {
            sub: subject.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))?;

        debug!(subject, expires_at = %claims.expires_at, "issued access token");

        Ok(AccessToken {
            token,
            expires_at: claims.expires_at,
        })
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let decoded = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        validate_claims(&decoded.claims, now)?;
        Ok(decoded.claims)
    }
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Duration::minutes(30))
    }

    #[test]
    fn issued_token_round_trips_subject() {
        let svc = service();
        let issued = svc.issue("alice", t0()).unwrap();
        assert_eq!(issued.expires_at, t0() + Duration::minutes(30));

        let claims = svc.validate(&issued.token, t0()).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.issued_at, t0());
    }

    #[test]
    fn token_is_valid_until_ttl_elapses() {
        let svc = service();
        let issued = svc.issue("alice", t0()).unwrap();

        let just_before = t0() + Duration::minutes(30) - Duration::seconds(1);
        assert!(svc.validate(&issued.token, just_before).is_ok());

        let at_expiry = t0() + Duration::minutes(30);
        assert_eq!(
            svc.validate(&issued.token, at_expiry),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn token_from_the_future_is_rejected() {
        let svc = service();
        let issued = svc.issue("alice", t0()).unwrap();
        assert_eq!(
            svc.validate(&issued.token, t0() - Duration::seconds(5)),
            Err(TokenError::Claims(TokenValidationError::NotYetValid))
        );
    }

    #[test]
    fn different_secret_rejects() {
        let issued = service().issue("alice", t0()).unwrap();
        let other = TokenService::new(b"other-secret", Duration::minutes(30));
        assert!(matches!(other.validate(&issued.token, t0()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(service().validate("invalid.token.here", t0()), Err(TokenError::Malformed(_))));
        assert!(matches!(service().validate("", t0()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn claims_window_is_checked() {
        let claims = JwtClaims {
            sub: "bob".into(),
            issued_at: t0(),
            expires_at: t0(),
        };
        assert_eq!(validate_claims(&claims, t0()), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn claims_use_standard_jwt_names() {
        let claims = JwtClaims {
            sub: "bob".into(),
            issued_at: t0(),
            expires_at: t0() + Duration::seconds(60),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "bob");
        assert_eq!(json["iat"], t0().timestamp());
        assert_eq!(json["exp"], t0().timestamp() + 60);
    }

    #[test]
    fn token_errors_surface_as_unauthorized() {
        let err: DomainError = TokenError::Claims(TokenValidationError::Expired).into();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        let err: DomainError = TokenError::Encode("boom".into()).into();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
