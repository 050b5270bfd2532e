use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Query, SupabaseClient};

use crate::models::{Doctor, DoctorError, RealDoctor, DOCTORS_TABLE, REAL_DOCTORS_TABLE};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All AI personas.
    pub async fn list_ai_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing AI doctors");

        self.supabase
            .select(&Query::table(DOCTORS_TABLE).eq("is_ai", true).order_asc("name"))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))
    }

    pub async fn get_doctor(&self, doctor_id: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let doctor: Option<Doctor> = self
            .supabase
            .select_one(Query::table(DOCTORS_TABLE).eq("id", doctor_id))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        doctor.ok_or(DoctorError::NotFound)
    }

    /// Human doctors, optionally narrowed to one exact specialty.
    pub async fn list_real_doctors(
        &self,
        specialty: Option<&str>,
    ) -> Result<Vec<RealDoctor>, DoctorError> {
        debug!("Listing real doctors (specialty: {:?})", specialty);

        let mut query = Query::table(REAL_DOCTORS_TABLE);
        if let Some(specialty) = specialty.filter(|s| !s.is_empty()) {
            query = query.eq("specialty", specialty);
        }

        self.supabase
            .select(&query.order_desc("rating"))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))
    }

    pub async fn get_real_doctor(&self, doctor_id: Uuid) -> Result<RealDoctor, DoctorError> {
        let doctor: Option<RealDoctor> = self
            .supabase
            .select_one(Query::table(REAL_DOCTORS_TABLE).eq("id", doctor_id))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        doctor.ok_or(DoctorError::NotFound)
    }
}
