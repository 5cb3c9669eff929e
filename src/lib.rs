use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use config::Config;
use services::auth::Authenticator;
use store::RecordStore;

// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            config,
            store,
            auth,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.max_file_size;

    Router::new()
        .merge(routes::routes())
        .merge(routes::clients::routes())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
