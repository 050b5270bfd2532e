use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn chat_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/start/{doctor_id}", post(handlers::start_chat))
        .route("/history", get(handlers::get_history))
        .route("/{session_id}", get(handlers::get_session))
        .route("/{session_id}/message", post(handlers::send_message))
        .route(
            "/{session_id}/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
