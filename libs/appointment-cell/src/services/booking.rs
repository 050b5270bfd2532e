use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use chat_cell::models::ChatError;
use chat_cell::services::ChatService;
use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::{Query, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, APPOINTMENTS_TABLE,
};

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppointmentError::Validation(format!("Invalid {}", what)))
}

pub struct BookingService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    chats: ChatService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            chats: ChatService::new(config),
        }
    }

    /// Books a `pending` appointment with a real doctor. `query_session_id`
    /// is used when the body carries no `chat_session_id`.
    pub async fn book(
        &self,
        user_id: &str,
        request: BookAppointmentRequest,
        query_session_id: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let real_doctor_id = parse_uuid(&request.real_doctor_id, "real doctor ID")?;

        let appointment_date = request
            .appointment_date
            .as_deref()
            .ok_or_else(|| AppointmentError::Validation("appointment_date is required".to_string()))
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|_| {
                        AppointmentError::Validation(
                            "appointment_date must be an RFC 3339 timestamp".to_string(),
                        )
                    })
            })?;

        let chat_session_id = request
            .chat_session_id
            .or(query_session_id)
            .filter(|s| !s.trim().is_empty())
            .map(|raw| parse_uuid(&raw, "chat session ID"))
            .transpose()?;

        debug!("Booking appointment for user {} with doctor {}", user_id, real_doctor_id);

        self.doctors
            .get_real_doctor(real_doctor_id)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => AppointmentError::DoctorNotFound,
                DoctorError::Database(msg) => AppointmentError::Database(msg),
            })?;

        if let Some(session_id) = chat_session_id {
            self.chats
                .get_session(session_id, user_id)
                .await
                .map_err(|e| match e {
                    ChatError::SessionNotFound => AppointmentError::ChatSessionNotFound,
                    other => AppointmentError::Database(other.to_string()),
                })?;
        }

        let now = Utc::now();
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "real_doctor_id": real_doctor_id,
            "chat_session_id": chat_session_id,
            "appointment_date": appointment_date,
            "status": AppointmentStatus::Pending,
            "symptoms": request.symptoms,
            "ai_recommendation": request.ai_recommendation,
            "created_at": now,
            "updated_at": now
        });

        let created: Vec<Appointment> = self
            .supabase
            .insert(APPOINTMENTS_TABLE, appointment_data)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointment = created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Failed to create appointment".to_string()))?;

        info!("Appointment {} booked for user {}", appointment.id, user_id);
        Ok(appointment)
    }

    /// The caller's appointments, soonest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for user {}", user_id);

        self.supabase
            .select(
                &Query::table(APPOINTMENTS_TABLE)
                    .eq("user_id", user_id)
                    .order_asc("appointment_date"),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    pub async fn get(&self, appointment_id: &str, user_id: &str) -> Result<Appointment, AppointmentError> {
        let appointment_id = parse_uuid(appointment_id, "appointment ID")?;

        let appointment: Option<Appointment> = self
            .supabase
            .select_one(
                Query::table(APPOINTMENTS_TABLE)
                    .eq("id", appointment_id)
                    .eq("user_id", user_id),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        appointment.ok_or(AppointmentError::NotFound)
    }

    /// Sets any of the four statuses; transitions are not restricted.
    pub async fn update_status(
        &self,
        appointment_id: &str,
        user_id: &str,
        status: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment_id = parse_uuid(appointment_id, "appointment ID")?;
        let status: AppointmentStatus = status.parse()?;

        let updated: Vec<Appointment> = self
            .supabase
            .update(
                &Query::table(APPOINTMENTS_TABLE)
                    .eq("id", appointment_id)
                    .eq("user_id", user_id),
                json!({
                    "status": status,
                    "updated_at": Utc::now()
                }),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointment = updated.into_iter().next().ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} is now {}", appointment.id, status);
        Ok(appointment)
    }
}
