//! Password hashing, JWT issuing/validation and the authenticated-user extractor.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

/// Random lowercase alphanumeric string.
pub fn random_token(len: usize) -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Hash a password with bcrypt. The result carries its own `$2b$<cost>$` prefix.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// False for a wrong password and for anything that is not a bcrypt hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: String,
    pub pseudo: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not authenticated")]
    MissingToken,
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("could not issue token: {0}")]
    Encode(String),
    #[error("could not hash password: {0}")]
    PasswordHash(String),
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issue an access token for `user_id`.
pub fn create_access_token(
    user_id: i64,
    pseudo: &str,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let iat = now_secs();
    let exp = iat
        .checked_add(config.token_ttl.as_secs())
        .ok_or_else(|| AuthError::Encode("token lifetime overflows the expiry".into()))?;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        pseudo: pseudo.to_string(),
        exp,
        iat,
    };
    let key = EncodingKey::from_secret(config.secret.as_bytes());
    encode(&Header::new(config.algorithm), &claims, &key)
        .map_err(|e| AuthError::Encode(e.to_string()))
}

/// Validate a token and extract its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(config.algorithm);
    validation.leeway = 0;

    let key = DecodingKey::from_secret(config.secret.as_bytes());
    let claims = decode::<TokenClaims>(token, &key, &validation)
        .map_err(map_jwt_error)?
        .claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }
    Ok(claims)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
        _ => AuthError::DecodeError(err.to_string()),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn cookie_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, config: &AuthConfig) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        config.cookie_name,
        token,
        config.token_ttl.as_secs()
    )
}

/// The user behind the request's bearer token or session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub pseudo: String,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = &state.config.auth;
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers, &auth.cookie_name))
            .ok_or(AuthError::MissingToken)?;

        let claims = validate_token(token, auth)?;
        let id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AuthError::MissingClaim("sub".into()))?;

        // Tokens outlive deleted accounts.
        let user = db::get_user(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User no longer exists".into()))?;

        Ok(CurrentUser {
            id,
            pseudo: user.pseudo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-256-bits-long!!";

    // Lowest cost bcrypt accepts, keeps the tests fast.
    const COST: u32 = 4;

    #[test]
    fn password_round_trip() {
        let stored = hash_password("hunter2", COST).unwrap();
        assert!(stored.starts_with("$2b$04$"));
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(
            hash_password("pw", COST).unwrap(),
            hash_password("pw", COST).unwrap()
        );
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("pw", "pw"));
        assert!(!verify_password("pw", "md5$abc$def"));
        // Fast unsalted digests are not accepted.
        assert!(!verify_password(
            "pw",
            "sha256$00$30c952fab122c3f9759f02a6d95c3758b246b4fee239957b2d4fee46e26170c4"
        ));
    }

    #[test]
    fn out_of_range_cost_is_an_error() {
        assert!(matches!(
            hash_password("pw", 2),
            Err(AuthError::PasswordHash(_))
        ));
    }

    #[test]
    fn huge_lifetime_fails_to_issue() {
        let mut config = AuthConfig::with_secret(SECRET);
        config.token_ttl = std::time::Duration::from_secs(u64::MAX);
        assert!(matches!(
            create_access_token(1, "bob", &config),
            Err(AuthError::Encode(_))
        ));
    }

    #[test]
    fn token_round_trip() {
        let config = AuthConfig::with_secret(SECRET);
        let token = create_access_token(42, "alice", &config).unwrap();
        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.pseudo, "alice");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create_access_token(1, "bob", &AuthConfig::with_secret(SECRET)).unwrap();
        let other = AuthConfig::with_secret("another-secret-key-entirely!!");
        assert!(matches!(
            validate_token(&token, &other),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_rejected() {
        let config = AuthConfig::with_secret(SECRET);
        let claims = TokenClaims {
            sub: "1".into(),
            pseudo: "bob".into(),
            exp: 1,
            iat: 0,
        };
        let token = encode(
            &Header::new(config.algorithm),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            validate_token(&token, &config),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn garbage_token_rejected() {
        let config = AuthConfig::with_secret(SECRET);
        assert!(validate_token("not-a-jwt", &config).is_err());
    }

    #[test]
    fn token_from_header_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=xyz; other=1"),
        );
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(cookie_token(&headers, "access_token"), Some("xyz"));
        assert_eq!(cookie_token(&headers, "missing"), None);
    }
}
