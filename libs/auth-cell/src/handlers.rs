use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(request) = payload?;
    let auth_service = AuthService::new(&config);

    let response = auth_service.register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(request) = payload?;
    let auth_service = AuthService::new(&config);

    let response = auth_service.login(request).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<UserProfile>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let auth_service = AuthService::new(&config);
    let profile = auth_service.get_profile(&user.id).await?;

    Ok(Json(profile))
}
