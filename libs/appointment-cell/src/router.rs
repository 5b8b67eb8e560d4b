// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::post,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn optimizer_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/suggest", post(handlers::suggest_slots))
        .route("/rebalance", post(handlers::rebalance))
        .with_state(state)
}

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .with_state(state)
}
