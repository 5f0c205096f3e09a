// Authentication and authorization middleware for protected routes

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Identity attached to a request once its access token is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub role: Role,
}

/// Reads the identity left in the request extensions by `require_auth`
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
///
/// The header must be exactly two space-separated parts with the `Bearer` scheme.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedAuthHeader)?;

    match value.split(' ').collect::<Vec<_>>().as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedAuthHeader),
    }
}

/// Auth gate: validates the access token and attaches `AuthenticatedUser`
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    let claims = {
        let token = bearer_token(request.headers()).map_err(|e| {
            warn!("Rejected request to {}: {}", endpoint, e);
            e
        })?;

        tokens.verify_access(token)?.map_err(|e| {
            warn!("Rejected access token for {}: {}", endpoint, e);
            AuthError::from(e)
        })?
    };

    debug!(
        "Authenticated user_id={}, role={}, endpoint={}",
        claims.user_id, claims.role, endpoint
    );
    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.user_id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Authorization middleware that requires one of a set of roles
///
/// Must run after `require_auth`.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    /// Create a new RequireRole middleware with the allowed roles
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        let mut roles: Vec<Role> = Vec::new();
        for role in allowed {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self { allowed: roles }
    }

    /// Admins only
    pub fn admin() -> Self {
        Self::new([Role::Admin])
    }

    /// Admins and editors
    pub fn staff() -> Self {
        Self::new([Role::Admin, Role::Editor])
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// Decide for an optional identity
    pub fn check(&self, user: Option<&AuthenticatedUser>) -> Result<(), AuthError> {
        let user = user.ok_or(AuthError::MissingToken)?;

        if !self.allows(user.role) {
            return Err(AuthError::InsufficientPermissions {
                allowed: self.allowed.clone(),
                actual: user.role,
            });
        }
        Ok(())
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(self, request: Request, next: Next) -> Result<Response, AuthError> {
        let user = request.extensions().get::<AuthenticatedUser>().cloned();

        if let Err(e) = self.check(user.as_ref()) {
            warn!(
                "Authorization failed: user={:?}, allowed={:?}, endpoint={}",
                user.map(|u| u.user_id),
                self.allowed,
                request.uri().path()
            );
            return Err(e);
        }

        Ok(next.run(request).await)
    }
}
