use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use chat_cell::router::chat_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/chat", chat_routes(state.clone()))
        .nest("/appointments", appointment_routes(state));

    Router::new()
        .route("/", get(|| async { "AI Doctor API is running!" }))
        .nest("/api", api)
}
