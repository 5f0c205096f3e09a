//! Authentication, session and authorization backend for the Inkwell CMS.
//!
//! Issues short-lived access tokens and cookie-bound refresh tokens, gates
//! routes on a valid access token, and restricts admin routes by role.

pub mod auth;
pub mod config;
pub mod db;
pub mod users;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{FromRef, Request},
    middleware::{self, Next},
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, ProfileUpdate,
        RefreshResponse, Role, SignupRequest, UpdateRoleRequest, UserResponse,
    },
    require_auth, AuthError, AuthService, CookiePolicy, CredentialStore, PasswordService,
    RequireRole, TokenService,
};
use config::{AuthConfig, ConfigError, RateLimitConfig};
use users::UserService;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::login_handler,
        auth::handlers::signup_handler,
        auth::handlers::refresh_handler,
        auth::handlers::logout_handler,
        auth::handlers::me_handler,
        auth::handlers::change_password_handler,
        users::handlers::list_users_handler,
        users::handlers::get_user_handler,
        users::handlers::update_profile_handler,
        users::handlers::update_role_handler,
        users::handlers::delete_user_handler,
    ),
    components(
        schemas(
            Role, UserResponse, LoginRequest, SignupRequest, AuthResponse, RefreshResponse,
            MessageResponse, ChangePasswordRequest, ProfileUpdate, UpdateRoleRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, signup and session endpoints"),
        (name = "users", description = "Profile and user administration endpoints")
    ),
    info(
        title = "Inkwell Auth API",
        version = "0.1.0",
        description = "Authentication and authorization for the Inkwell CMS"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Wire the services over a credential store
    pub fn new(store: Arc<dyn CredentialStore>, config: &AuthConfig) -> Result<Self, AuthError> {
        let tokens = Arc::new(TokenService::new(
            config.access_secret.clone(),
            config.refresh_secret.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));
        let passwords = PasswordService::new(config.password)?;
        let cookies = CookiePolicy::new(config.secure_cookies, config.refresh_token_ttl);

        Ok(Self {
            auth: Arc::new(AuthService::new(store.clone(), passwords, tokens.clone(), cookies)),
            users: Arc::new(UserService::new(store)),
            tokens,
        })
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Routes restricted to `gate`'s roles; the auth gate is layered on by the caller
fn role_gated(routes: Router<AppState>, gate: RequireRole) -> Router<AppState> {
    routes.route_layer(middleware::from_fn(move |request: Request, next: Next| {
        gate.clone().middleware(request, next)
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Creates and configures the application router
///
/// Login and signup are rate limited per client IP when `rate_limit` is set,
/// which needs the server to provide `ConnectInfo<SocketAddr>`.
pub fn create_router(
    state: AppState,
    rate_limit: Option<RateLimitConfig>,
) -> Result<Router, ConfigError> {
    let mut credentials = Router::new()
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/signup", post(auth::signup_handler));

    if let Some(limit) = rate_limit {
        let governor = GovernorConfigBuilder::default()
            .per_second(limit.per_second)
            .burst_size(limit.burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or(ConfigError::Invalid {
                name: "AUTH_RATE_LIMIT_PER_SECOND",
                value: limit.per_second.to_string(),
            })?;

        credentials = credentials.layer(GovernorLayer {
            config: Box::leak(Box::new(governor)),
        });
    }

    let admin = role_gated(
        Router::new()
            .route("/api/users", get(users::list_users_handler))
            .route("/api/users/:id/role", put(users::update_role_handler))
            .route("/api/users/:id", delete(users::delete_user_handler)),
        RequireRole::admin(),
    );

    let staff = role_gated(
        Router::new().route("/api/users/:id", get(users::get_user_handler)),
        RequireRole::staff(),
    );

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/password", put(auth::change_password_handler))
        .route("/api/users/me", patch(users::update_profile_handler))
        .merge(admin)
        .merge(staff)
        .route_layer(middleware::from_fn_with_state(state.tokens.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .merge(credentials)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state);

    Ok(router)
}
