//! # adboard: a classifieds marketplace backend
//!
//! `adboard` is the backend for a classifieds marketplace: users register and
//! log in, post ads with photos, search and filter listings, and manage their
//! own ads (update, delete, mark sold).
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence needs.
//!
//! The **API layer** ([`api`]) exposes the public surface: authentication at
//! `/auth/*`, ad search and mutation at `/ads`, the caller's profile at
//! `/users/profile`, and stored photo files at `/uploads/*`. Handlers
//! validate input, enforce ownership, orchestrate repository and photo store
//! calls, and shape responses.
//!
//! The **authentication layer** ([`auth`]) hashes passwords with Argon2id and
//! issues signed, time-limited JWT session tokens. Protected handlers receive
//! the caller through an extractor that reads the `Authorization: Bearer`
//! header.
//!
//! The **database layer** ([`db`]) uses the repository pattern to abstract
//! data access. Multi-statement writes - an ad insert with its photo rows,
//! a photos-then-ad delete - run inside one transaction each, so an
//! interrupted request can never leave partial state behind. Uploaded photo
//! files live behind the [`db::handlers::photo_storage::PhotoStorage`] trait
//! and are served statically.
//!
//! ## Quick start
//!
//! ```no_run
//! use clap::Parser;
//! use adboard::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = adboard::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     adboard::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database setup
//!
//! The application requires a PostgreSQL database and automatically runs
//! migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! adboard::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::api::handlers::ads::MAX_PHOTOS_PER_AD;
use crate::db::handlers::photo_storage::{self, PhotoStorage};
use crate::openapi::ApiDoc;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post, put},
};
use base64::{Engine as _, engine::general_purpose};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{AdId, AdTypeId, CityId, PhotoId, UserId};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `db`: PostgreSQL connection pool
/// - `config`: Application configuration loaded from file/environment
/// - `photo_storage`: Backend for uploaded photo files
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .photo_storage(photo_storage)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub photo_storage: Arc<dyn PhotoStorage>,
}

/// Get the adboard database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Generate a random process-lifetime signing key.
fn generate_secret_key() -> String {
    use rand::Rng;

    let mut key_bytes = [0u8; 32];
    rand::rng().fill(&mut key_bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(key_bytes)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    use axum::http::{Method, header};

    let mut cors = if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        // Config validation guarantees credentials are off for the wildcard
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(config.cors.allow_credentials)
    };

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - Authentication routes (register, login, password reset)
/// - Ad routes (public search, owner-gated mutation)
/// - Profile routes
/// - Static serving of stored photos under `/uploads`
/// - OpenAPI documentation at `/docs`
/// - CORS configuration and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Generous per-request ceiling: a full complement of photos plus form fields
    let ad_body_limit = state.config.uploads.max_photo_size as usize * MAX_PHOTOS_PER_AD + 1024 * 1024;

    let auth_routes = Router::new()
        .route("/auth/register", post(api::handlers::auth::register))
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/reset-password", post(api::handlers::auth::reset_password));

    let ad_routes = Router::new()
        .route(
            "/ads",
            get(api::handlers::ads::search_ads)
                .post(api::handlers::ads::create_ad)
                .layer(DefaultBodyLimit::max(ad_body_limit)),
        )
        .route(
            "/ads/{id}",
            put(api::handlers::ads::update_ad).delete(api::handlers::ads::delete_ad),
        )
        .route("/ads/{id}/mark-sold", patch(api::handlers::ads::mark_ad_sold));

    let user_routes = Router::new().route(
        "/users/profile",
        get(api::handlers::users::get_profile).put(api::handlers::users::update_profile),
    );

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .merge(ad_routes)
        .merge(user_routes)
        .with_state(state.clone())
        // Stored photo references resolve through this static boundary
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and prepares the photo storage directory
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application against an existing pool (used by tests).
    pub async fn new_with_pool(mut config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        // The signing key is configuration; without one, outstanding tokens
        // are invalidated by every restart
        if config.secret_key.is_none() {
            warn!("No secret_key configured: generating a process-lifetime key, session tokens will not survive a restart");
            config.secret_key = Some(generate_secret_key());
        }

        let pool = match pool {
            Some(pool) => pool,
            None => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("database_url must be configured (set DATABASE_URL)"))?;
                PgPool::connect(url).await?
            }
        };

        migrator().run(&pool).await?;

        let photo_storage = photo_storage::create_photo_storage(&config.uploads).await?;

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .photo_storage(photo_storage)
            .build();

        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("adboard listening on http://{}", bind_addr);

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
