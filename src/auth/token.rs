// JWT token generation and validation service

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{error::AuthError, models::Role};

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub role: Role,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
    /// Random id so two tokens issued in the same second still differ
    pub jti: String,
}

/// Why a token failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Invalid => AuthError::InvalidToken,
        }
    }
}

/// Sign a token for `user_id`/`role` that expires `ttl` from now
pub fn issue_token(user_id: i32, role: Role, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        user_id,
        role,
        iat: now,
        exp: now + ttl.num_seconds(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
}

/// Check signature, structure and expiry of a token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

/// Token service for JWT operations
///
/// Access and refresh tokens are signed with independent secrets, so a leaked
/// key for one class cannot mint tokens of the other.
#[derive(Debug, Clone)]
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenService {
    /// Access tokens default to 15 minutes (900 seconds)
    pub const DEFAULT_ACCESS_TTL_SECS: i64 = 900;
    /// Refresh tokens default to 7 days (604800 seconds)
    pub const DEFAULT_REFRESH_TTL_SECS: i64 = 604_800;

    pub fn new(
        access_secret: String,
        refresh_secret: String,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    /// Service with the default lifetimes
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self::new(
            access_secret.into(),
            refresh_secret.into(),
            Duration::seconds(Self::DEFAULT_ACCESS_TTL_SECS),
            Duration::seconds(Self::DEFAULT_REFRESH_TTL_SECS),
        )
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    fn access_key(&self) -> Result<&str, AuthError> {
        if self.access_secret.is_empty() {
            return Err(AuthError::ConfigError("ACCESS_TOKEN_SECRET not configured".to_string()));
        }
        Ok(&self.access_secret)
    }

    fn refresh_key(&self) -> Result<&str, AuthError> {
        if self.refresh_secret.is_empty() {
            return Err(AuthError::ConfigError("REFRESH_TOKEN_SECRET not configured".to_string()));
        }
        Ok(&self.refresh_secret)
    }

    /// Generate an access token
    pub fn issue_access(&self, user_id: i32, role: Role) -> Result<String, AuthError> {
        issue_token(user_id, role, self.access_key()?, self.access_token_ttl)
    }

    /// Generate a refresh token
    pub fn issue_refresh(&self, user_id: i32, role: Role) -> Result<String, AuthError> {
        issue_token(user_id, role, self.refresh_key()?, self.refresh_token_ttl)
    }

    /// Generate both access and refresh tokens
    pub fn issue_pair(&self, user_id: i32, role: Role) -> Result<(String, String), AuthError> {
        let access_token = self.issue_access(user_id, role)?;
        let refresh_token = self.issue_refresh(user_id, role)?;
        Ok((access_token, refresh_token))
    }

    /// Validate an access token; the outer error is a missing secret
    pub fn verify_access(&self, token: &str) -> Result<Result<Claims, TokenError>, AuthError> {
        Ok(verify_token(token, self.access_key()?))
    }

    /// Validate a refresh token; the outer error is a missing secret
    pub fn verify_refresh(&self, token: &str) -> Result<Result<Claims, TokenError>, AuthError> {
        Ok(verify_token(token, self.refresh_key()?))
    }
}
