use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::State,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::{appointment_routes, optimizer_routes};
use shared_config::AppConfig;

async fn ping(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({ "message": config.ping_message }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic slot allocation API is running!" }))
        .route("/api/ping", get(ping).with_state(state.clone()))
        .nest("/api/optimizer", optimizer_routes(state.clone()))
        .nest("/api/appointments", appointment_routes(state))
}
