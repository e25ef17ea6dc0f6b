/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use webring_api::{app::AppState, config::Config};
/// use webring_shared::{db::pool::create_pool, mail::LogMailer, store::PgStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let mailer = Arc::new(LogMailer::new(config.mail.from.clone()));
/// let state = AppState::new(Arc::new(PgStore::new(pool)), mailer, config);
/// let app = webring_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use webring_shared::{
    error::DomainError,
    mail::Mailer,
    models::user::User,
    services::{UserService, WebringService},
    store::Store,
};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    pub users: UserService,

    pub webrings: WebringService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services over `store` using the configured auth settings
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let users = UserService::new(store.clone(), mailer)
            .with_password_policy(config.password_policy())
            .with_session_ttl(config.session_ttl());
        let webrings = WebringService::new(store.clone());

        Self {
            store,
            users,
            webrings,
            config: Arc::new(config),
        }
    }
}

/// The authenticated caller, inserted into request extensions by
/// `session_auth_layer`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,

    /// Bearer token the request was made with
    pub token: String,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                   # Health check (public)
/// ├── /webring/:webring_url/sites  GET          # Member list for embeds (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /logout                      (session)
///     ├── /users/me        GET, PUT             (session)
///     ├── /webrings        GET search, POST     (POST: session)
///     └── /webring/:webring_url
///         ├── GET, DELETE                       (DELETE: session)
///         ├── /sites       GET, POST            (POST: session)
///         └── /sites/:site_id  DELETE           (session)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Unversioned alias of the public member list, used by embedded widgets
    let embed_routes = Router::new().route(
        "/webring/:webring_url/sites",
        get(routes::webrings::get_sites),
    );

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/webrings", get(routes::webrings::search))
        .route("/webring/:webring_url", get(routes::webrings::get_webring))
        .route("/webring/:webring_url/sites", get(routes::webrings::get_sites));

    let session_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route(
            "/users/me",
            get(routes::users::get_me).put(routes::users::update_me),
        )
        .route("/webrings", post(routes::webrings::create_webring))
        .route("/webring/:webring_url", delete(routes::webrings::delete_webring))
        .route("/webring/:webring_url/sites", post(routes::webrings::add_site))
        .route(
            "/webring/:webring_url/sites/:site_id",
            delete(routes::webrings::remove_site),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let v1_routes = public_routes.merge(session_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .merge(embed_routes)
        .nest("/v1", v1_routes)
        .fallback(routes::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Session authentication middleware layer
///
/// Resolves the bearer token to a user and injects `AuthUser` into request
/// extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.to_string();

    let user = state.users.authenticate(&token).await.map_err(|e| match e {
        DomainError::InvalidCredentials => {
            ApiError::Unauthorized("Invalid or expired session".to_string())
        }
        other => ApiError::from(other),
    })?;

    req.extensions_mut().insert(AuthUser { user, token });

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))
}
