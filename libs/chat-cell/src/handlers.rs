use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ChatSession, ImageMessageResponse, ImageUpload, Message, SendMessageRequest};
use crate::services::ChatService;

fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid session ID".to_string()))
}

#[axum::debug_handler]
pub async fn start_chat(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<String>,
) -> Result<Json<ChatSession>, AppError> {
    let chat_service = ChatService::new(&state);

    let session = chat_service.start_session(&user.id, &doctor_id).await?;

    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Message>, AppError> {
    let session_id = parse_session_id(&session_id)?;
    let Json(request) = payload?;
    let chat_service = ChatService::new(&state);

    let reply = chat_service
        .send_message(session_id, &user.id, &request.content, None)
        .await?;

    Ok(Json(reply))
}

#[axum::debug_handler]
pub async fn upload_image(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ImageMessageResponse>, AppError> {
    let session_id = parse_session_id(&session_id)?;

    let mut content = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some(ImageUpload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "content" => {
                content = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            other => debug!("Ignoring multipart field {}", other),
        }
    }

    let upload = upload
        .filter(|u| !u.data.is_empty())
        .ok_or_else(|| AppError::BadRequest("Failed to get image file".to_string()))?;

    let chat_service = ChatService::new(&state);
    let response = chat_service
        .send_image_message(session_id, &user.id, content, upload)
        .await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_history(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let chat_service = ChatService::new(&state);

    let sessions = chat_service.history(&user.id).await?;

    Ok(Json(json!({ "sessions": sessions })))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSession>, AppError> {
    let session_id = parse_session_id(&session_id)?;
    let chat_service = ChatService::new(&state);

    let session = chat_service.get_session(session_id, &user.id).await?;

    Ok(Json(session))
}
