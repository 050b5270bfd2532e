use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorError};
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::{Query, SupabaseClient};

use crate::models::{
    welcome_message, ChatError, ChatSession, ImageAttachment, ImageMessageResponse, ImageUpload,
    Message, MessageSender, SessionStatus, CHAT_SESSIONS_TABLE, DEFAULT_UPLOAD_CONTENT,
};
use crate::services::ai::GeminiClient;
use crate::services::context::build_prompt;
use crate::services::escalation::{should_recommend_real_doctor, ESCALATION_NOTICE};
use crate::services::storage::S3Storage;

pub struct ChatService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    config: AppConfig,
}

impl ChatService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            config: config.clone(),
        }
    }

    async fn doctor(&self, doctor_id: &str) -> Result<Doctor, ChatError> {
        self.doctors.get_doctor(doctor_id).await.map_err(|e| match e {
            DoctorError::NotFound => ChatError::DoctorNotFound,
            DoctorError::Database(msg) => ChatError::Database(msg),
        })
    }

    fn to_row(session: &ChatSession) -> Value {
        json!({
            "id": session.id,
            "user_id": session.user_id,
            "doctor_id": session.doctor_id,
            "messages": session.messages,
            "status": session.status,
            "active_key": session.active_key,
            "version": session.version,
            "created_at": session.created_at,
            "updated_at": session.updated_at
        })
    }

    async fn find_active(&self, active_key: &str) -> Result<Option<ChatSession>, ChatError> {
        self.supabase
            .select_one(Query::table(CHAT_SESSIONS_TABLE).eq("active_key", active_key))
            .await
            .map_err(|e| ChatError::Database(e.to_string()))
    }

    /// Returns the caller's active session with this doctor, creating it with
    /// a welcome message if there is none.
    pub async fn start_session(&self, user_id: &str, doctor_id: &str) -> Result<ChatSession, ChatError> {
        debug!("Starting chat for user {} with doctor {}", user_id, doctor_id);

        let doctor = self.doctor(doctor_id).await?;
        let active_key = ChatSession::active_key_for(user_id, doctor_id);

        if let Some(existing) = self.find_active(&active_key).await? {
            debug!("Resuming active session {}", existing.id);
            return Ok(existing);
        }

        let now = Utc::now();
        let welcome = Message::after(
            None,
            welcome_message(&doctor.name, &doctor.specialty),
            MessageSender::System,
            None,
        );
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            doctor_id: doctor.id.clone(),
            messages: vec![welcome],
            status: SessionStatus::Active,
            active_key: Some(active_key.clone()),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        // A concurrent start for the same pair loses on the unique active_key
        // and reads back the winner's row.
        let inserted: Vec<ChatSession> = self
            .supabase
            .insert_ignore_duplicates(CHAT_SESSIONS_TABLE, "active_key", Self::to_row(&session))
            .await
            .map_err(|e| ChatError::Database(e.to_string()))?;

        if let Some(created) = inserted.into_iter().next() {
            info!("Created chat session {} for user {}", created.id, user_id);
            return Ok(created);
        }

        self.find_active(&active_key).await?.ok_or(ChatError::Conflict)
    }

    pub async fn get_session(&self, session_id: Uuid, user_id: &str) -> Result<ChatSession, ChatError> {
        debug!("Fetching session {} for user {}", session_id, user_id);

        let session: Option<ChatSession> = self
            .supabase
            .select_one(
                Query::table(CHAT_SESSIONS_TABLE)
                    .eq("id", session_id)
                    .eq("user_id", user_id),
            )
            .await
            .map_err(|e| ChatError::Database(e.to_string()))?;

        session.ok_or(ChatError::SessionNotFound)
    }

    /// All of the caller's sessions, newest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ChatSession>, ChatError> {
        debug!("Listing chat history for user {}", user_id);

        self.supabase
            .select(
                &Query::table(CHAT_SESSIONS_TABLE)
                    .eq("user_id", user_id)
                    .order_desc("created_at"),
            )
            .await
            .map_err(|e| ChatError::Database(e.to_string()))
    }

    /// Appends the user's message and the AI reply in one versioned write and
    /// returns the reply.
    pub async fn send_message(
        &self,
        session_id: Uuid,
        user_id: &str,
        content: &str,
        image: Option<ImageAttachment>,
    ) -> Result<Message, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::Validation("content is required".to_string()));
        }

        let mut session = self.get_session(session_id, user_id).await?;
        let doctor = self.doctor(&session.doctor_id).await?;

        let user_message = Message::after(
            session.last_message(),
            content.to_string(),
            MessageSender::User,
            image.as_ref().map(|i| i.url.clone()),
        );
        session.messages.push(user_message);

        let prompt = build_prompt(&doctor.prompt, &session.messages, content, image.is_some());

        let gemini = GeminiClient::new(&self.config).map_err(|e| ChatError::Ai(e.to_string()))?;
        let mut reply = gemini
            .generate_response(&doctor.prompt, &prompt, image.as_ref())
            .await
            .map_err(|e| ChatError::Ai(e.to_string()))?;

        let escalate = should_recommend_real_doctor(&reply, content);
        if escalate {
            reply.push_str(ESCALATION_NOTICE);
            if session.status == SessionStatus::Active {
                info!("Session {} escalated to a real doctor", session.id);
                session.status = SessionStatus::DoctorRecommended;
                session.active_key = None;
            }
        }

        let ai_message = Message::after(session.last_message(), reply, MessageSender::Ai, None);
        session.messages.push(ai_message.clone());

        let updated: Vec<Value> = self
            .supabase
            .update(
                &Query::table(CHAT_SESSIONS_TABLE)
                    .eq("id", session.id)
                    .eq("version", session.version),
                json!({
                    "messages": session.messages,
                    "status": session.status,
                    "active_key": session.active_key,
                    "version": session.version + 1,
                    "updated_at": Utc::now()
                }),
            )
            .await
            .map_err(|e| ChatError::Database(e.to_string()))?;

        if updated.is_empty() {
            warn!("Lost update on session {} at version {}", session.id, session.version);
            return Err(ChatError::Conflict);
        }

        Ok(ai_message)
    }

    /// Stores the image, then sends it with `content` (or the default
    /// prompt) as a regular message.
    pub async fn send_image_message(
        &self,
        session_id: Uuid,
        user_id: &str,
        content: Option<String>,
        upload: ImageUpload,
    ) -> Result<ImageMessageResponse, ChatError> {
        // Ownership is checked before anything is uploaded.
        self.get_session(session_id, user_id).await?;

        let storage = S3Storage::new(&self.config)
            .await
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        let mime_type = upload.content_type.clone();
        let data = upload.data.clone();
        let stored = storage
            .upload_image(upload)
            .await
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        let content = content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_CONTENT.to_string());

        let attachment = ImageAttachment {
            url: stored.url.clone(),
            mime_type,
            data,
        };
        let message = self
            .send_message(session_id, user_id, &content, Some(attachment))
            .await?;

        Ok(ImageMessageResponse {
            message,
            image_url: stored.url,
            preview_url: stored.preview_url,
        })
    }
}
