//! Bearer-token auth collaborator.
//!
//! Issues and validates HS256 tokens whose claims decode once into a typed
//! [`Principal`]; handlers receive that value instead of an untyped decoded
//! payload. Credential verification (password hashing) is outside this
//! core.

use chrono::{Duration, Utc};
use db::models::user::{User, UserRole};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session token lifetime.
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("jwt error: {0}")]
    Jwt(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature => AuthError::InvalidToken,
            _ => AuthError::Jwt(err),
        }
    }
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id the session belongs to
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// The typed identity handed to request handlers after validation.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Clone)]
pub struct AuthService {
    secret: SecretString,
}

impl AuthService {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Issue a session token for the given user.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )?;
        Ok(token)
    }

    /// Validate a bearer token and return the principal it names.
    pub fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )?;

        Ok(Principal {
            user_id: data.claims.sub,
            username: data.claims.username,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(secret: &str) -> AuthService {
        AuthService::new(SecretString::from(secret.to_string()))
    }

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips_to_the_same_principal() {
        let auth = service("test-secret");
        let user = user(UserRole::Member);

        let token = auth.issue_token(&user).unwrap();
        let principal = auth.validate(&token).unwrap();

        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.username, "alice");
        assert!(!principal.is_admin());
    }

    #[test]
    fn token_carries_the_admin_role() {
        let auth = service("test-secret");
        let token = auth.issue_token(&user(UserRole::Admin)).unwrap();
        assert!(auth.validate(&token).unwrap().is_admin());
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let token = service("secret-a").issue_token(&user(UserRole::Member)).unwrap();
        let err = service("secret-b").validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = service("s").validate("  ").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
