use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{is_conflict, Query, SupabaseClient};
use shared_utils::jwt::generate_token;

use crate::models::{
    AuthError, AuthResponse, LoginRequest, RegisterRequest, UserProfile, UserRecord,
    MIN_PASSWORD_LENGTH,
};
use crate::services::password::PasswordService;

const USERS_TABLE: &str = "users";

static EMAIL_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254
        && EMAIL_REGEX
            .as_ref()
            .is_some_and(|re| re.is_match(email))
}

pub struct AuthService {
    supabase: SupabaseClient,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
        if request.name.trim().is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }
        if !validate_email(&normalize_email(&request.email)) {
            return Err(AuthError::Validation("a valid email is required".to_string()));
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        self.supabase
            .select_one(Query::table(USERS_TABLE).eq("email", email))
            .await
            .map_err(|e| AuthError::Database(e.to_string()))
    }

    fn issue(&self, user: UserProfile) -> Result<AuthResponse, AuthError> {
        let token = generate_token(&user.id.to_string(), &user.email, &self.jwt_secret)
            .map_err(AuthError::Token)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        Self::validate_registration(&request)?;

        let email = normalize_email(&request.email);
        debug!("Registering user: {}", email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let now = Utc::now();
        let user_data = json!({
            "id": Uuid::new_v4(),
            "name": request.name.trim(),
            "email": email,
            "password_hash": password_hash,
            "created_at": now,
            "updated_at": now
        });

        // The unique index on email still catches a concurrent registration.
        let created: Vec<UserRecord> = self
            .supabase
            .insert(USERS_TABLE, user_data)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    AuthError::UserExists
                } else {
                    error!("Failed to create user {}: {}", email, e);
                    AuthError::Database(e.to_string())
                }
            })?;

        let record = created
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::Database("Failed to create user".to_string()))?;

        info!("Registered user {}", record.id);
        self.issue(record.into())
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        debug!("Login attempt for: {}", email);

        let Some(record) = self.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let matches = PasswordService::verify_password(&request.password, &record.password_hash)
            .unwrap_or_else(|e| {
                warn!("Stored password hash for {} is unreadable: {}", record.id, e);
                false
            });

        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue(record.into())
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, AuthError> {
        debug!("Fetching profile for user: {}", user_id);

        let record: Option<UserRecord> = self
            .supabase
            .select_one(Query::table(USERS_TABLE).eq("id", user_id))
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        record.map(UserProfile::from).ok_or(AuthError::UserNotFound)
    }
}
