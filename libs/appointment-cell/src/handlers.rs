use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Appointment, BookAppointmentRequest, BookingQuery, UpdateStatusRequest};
use crate::services::BookingService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<BookingQuery>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let Json(request) = payload?;
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .book(&user.id, request, query.chat_session_id)
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointments = booking_service.list_for_user(&user.id).await?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service.get(&appointment_id, &user.id).await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;
    let booking_service = BookingService::new(&state);

    booking_service
        .update_status(&appointment_id, &user.id, &request.status)
        .await?;

    Ok(Json(json!({ "message": "Appointment status updated successfully" })))
}
