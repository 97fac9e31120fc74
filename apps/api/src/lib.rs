//! # Market API
//!
//! REST server for the POS back-office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Market API Routes                               │
//! │                                                                         │
//! │  ┌────────────────┐  ┌──────────────────────────────────────────────┐  │
//! │  │  Public        │  │  /v1 (bearer token)                          │  │
//! │  │                │  │                                              │  │
//! │  │ • GET /health  │  │ • CRUD /<entity>, /<entity>/{id}            │  │
//! │  │ • POST /login  │  │ • sale, shift, payment, income_product      │  │
//! │  └────────────────┘  │   creates through the reconcile workflows   │  │
//! │                      │ • GET  /sale/scan-barcode                    │  │
//! │                      │ • GET  /dosale                               │  │
//! │                      │ • POST /doincome/{coming_id}                 │  │
//! │                      │ • PUT  /shift_table/{id}?method=             │  │
//! │                      │ • /user (SUPER-ADMIN only)                   │  │
//! │                      └──────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │  List cache  │  │    JWT Auth              ││  │
//! │  │  │  (market-db) │  │  Redis or    │  │                          ││  │
//! │  │  │              │  │  in-memory   │  │ HS256, 24h access tokens ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `SERVICE_HOST` / `SERVICE_HTTP_PORT` - Listen address (default: 0.0.0.0:8080)
//! - `DATABASE_PATH` - SQLite file (default: ./data/market.db)
//! - `REDIS_URL` - Redis for the list cache; in-memory when unset
//! - `SECRET_KEY` - Secret for JWT signing

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{
    HeaderName, ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_TYPE, ORIGIN,
};
use axum::http::Method;
use axum::Router;
use market_db::{with_deadline, Database, DbResult};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::JwtManager;
pub use cache::ListCache;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: ListCache,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, cache: ListCache, config: ApiConfig) -> Self {
        AppState {
            db,
            cache,
            jwt: Arc::new(JwtManager::new(&config.secret_key)),
            config: Arc::new(config),
        }
    }

    /// Runs a store call under the request deadline.
    pub async fn within<T, F>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        with_deadline(self.config.request_deadline, fut)
            .await
            .map_err(ApiError::from)
    }

    pub fn list_cache_ttl(&self) -> Duration {
        self.config.list_cache_ttl
    }
}

/// Builds the full router: public routes, the authenticated `/v1` tree,
/// CORS and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::public())
        .nest("/v1", routes::v1(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::OPTIONS,
            Method::GET,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
        ])
        .allow_headers([
            HeaderName::from_static("password"),
            CONTENT_TYPE,
            CONTENT_LENGTH,
            ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            AUTHORIZATION,
            ACCEPT,
            ORIGIN,
            CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(3600))
}

// =============================================================================
// Router Tests
// =============================================================================
