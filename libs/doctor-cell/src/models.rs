use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

pub const DOCTORS_TABLE: &str = "doctors";
pub const REAL_DOCTORS_TABLE: &str = "real_doctors";

/// An AI persona. The system prompt is loaded for the chat cell but never
/// sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub description: String,
    pub avatar: String,
    pub is_ai: bool,
    #[serde(default, skip_serializing)]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealDoctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub hospital: String,
    pub experience: i32,
    pub rating: f64,
    pub availability: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealDoctorQuery {
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::Database(msg) => AppError::Database(msg),
        }
    }
}
