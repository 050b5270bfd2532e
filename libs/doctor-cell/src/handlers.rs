use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{Doctor, RealDoctorQuery};
use crate::services::doctor::DoctorService;

#[axum::debug_handler]
pub async fn list_doctors(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service.list_ai_doctors().await?;

    Ok(Json(json!({ "doctors": doctors })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Doctor>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(&doctor_id).await?;

    Ok(Json(doctor))
}

#[axum::debug_handler]
pub async fn list_real_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<RealDoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service
        .list_real_doctors(query.specialty.as_deref())
        .await?;

    Ok(Json(json!({ "doctors": doctors })))
}
