//! # caja-server: HTTP API for Caja POS
//!
//! Axum routes, JWT middleware and the mapping from service errors to HTTP
//! responses. All business rules live in `caja-core` and `caja-db`; the
//! handlers here parse, authenticate, delegate and serialize.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  client ──► TraceLayer ──► CorsLayer ──► /api router                    │
//! │                                            │                            │
//! │                  ┌─────────────────────────┴──────────────┐             │
//! │                  ▼                                        ▼             │
//! │         public: /health, /auth/login,          auth_middleware (JWT)    │
//! │                 /auth/register                             │             │
//! │                                                            ▼             │
//! │                                  /products  /sales  /users  /auth/profile│
//! │                                                            │             │
//! │                                                            ▼             │
//! │                       SaleWorkflow · CatalogService · AccountService ·   │
//! │                       ReportService  (caja-db)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::config::ServerConfig;
use caja_db::{AccountService, CatalogService, Database, ReportService, SaleWorkflow};

/// Application state shared across handlers.
///
/// Built once in `main` around a single [`Database`]; every service holds a
/// clone of the same pool.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub workflow: SaleWorkflow,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub reports: ReportService,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.token_lifetime_secs);

        AppState {
            workflow: SaleWorkflow::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            accounts: AccountService::new(db.clone()),
            reports: ReportService::new(db.clone()),
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
