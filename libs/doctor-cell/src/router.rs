use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

/// The directory is public; `/real` is a static segment and wins over `/{doctor_id}`.
pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/real", get(handlers::list_real_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .with_state(state)
}
