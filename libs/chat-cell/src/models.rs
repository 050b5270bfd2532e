use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

pub const CHAT_SESSIONS_TABLE: &str = "chat_sessions";
pub const DEFAULT_UPLOAD_CONTENT: &str = "I've uploaded an image. Please analyze it.";

pub fn welcome_message(doctor_name: &str, specialty: &str) -> String {
    format!(
        "Hello! I'm {}, your AI {}. How can I help you today? Please tell me about your symptoms or concerns.",
        doctor_name, specialty
    )
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    DoctorRecommended,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender: MessageSender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Builds a message stamped strictly after `previous`, so the sequence
    /// stays ordered even when the clock does not advance between appends.
    pub fn after(
        previous: Option<&Message>,
        content: String,
        sender: MessageSender,
        image_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let timestamp = match previous {
            Some(prev) if prev.timestamp >= now => prev.timestamp + Duration::microseconds(1),
            _ => now,
        };

        Self {
            id: Uuid::new_v4(),
            content,
            sender,
            image_url,
            timestamp,
        }
    }
}

/// Session row. `active_key` and `version` are storage bookkeeping and stay
/// out of API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub doctor_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing)]
    pub active_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn active_key_for(user_id: &str, doctor_id: &str) -> String {
        format!("{}:{}", user_id, doctor_id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
}

/// Image that rides along with a user message.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub url: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
    pub preview_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMessageResponse {
    pub message: Message,
    pub image_url: String,
    pub preview_url: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("Chat session not found")]
    SessionNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Chat session was modified concurrently, please retry")]
    Conflict,

    #[error("AI service error: {0}")]
    Ai(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::SessionNotFound | ChatError::DoctorNotFound => {
                AppError::NotFound(err.to_string())
            }
            ChatError::Validation(msg) => AppError::ValidationError(msg),
            ChatError::Conflict => AppError::Conflict(err.to_string()),
            ChatError::Ai(msg) | ChatError::Storage(msg) => AppError::ExternalService(msg),
            ChatError::Database(msg) => AppError::Database(msg),
        }
    }
}
