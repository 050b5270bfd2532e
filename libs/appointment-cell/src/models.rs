use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

pub const APPOINTMENTS_TABLE: &str = "appointments";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::Validation(format!(
                "Invalid status '{}': expected pending, confirmed, completed or cancelled",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub real_doctor_id: Uuid,
    #[serde(default)]
    pub chat_session_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub ai_recommendation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw booking payload; identifiers and the date are validated by the service
/// so malformed input maps to 400 with a JSON error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub real_doctor_id: String,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub ai_recommendation: String,
    #[serde(default)]
    pub chat_session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
    pub chat_session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Chat session not found")]
    ChatSessionNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::ChatSessionNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}
