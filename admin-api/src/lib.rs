//! Student council admin API
//!
//! Threads the access core through every request:
//!
//! - `config`: Service configuration
//! - `db`: PostgreSQL pool and the `users`-table directory
//! - `error`: Error types and HTTP mapping (including access denials)
//! - `middleware`: Session loading, access resolution and route guards
//! - `api`: Session, access-introspection and interface-tier routes
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use access_control::{AccessGate, AccessPipeline, SessionStore, UserDirectory};
use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub pipeline: AccessPipeline,
    pub gate: AccessGate,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let pipeline = AccessPipeline::new(config.access.bridge(), directory);
        let gate = config.access.gate();
        Self {
            config,
            sessions,
            pipeline,
            gate,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_access,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
