use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "http://localhost:54321";
pub const DEFAULT_DATABASE_NAME: &str = "public";
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_S3_BUCKET: &str = "ai-doctor-images";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub database_api_key: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub aws_region: String,
    pub aws_access_key: String,
    pub aws_secret_key: String,
    pub s3_bucket: String,
    /// S3-compatible endpoint (MinIO, a local mock). Buckets are then
    /// addressed path-style: `{endpoint}/{bucket}/{key}`.
    pub s3_endpoint: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            if default.is_empty() {
                warn!("{} not set, using empty value", key);
            } else {
                warn!("{} not set, using default", key);
            }
            default.to_string()
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("PORT is not a valid port number ({}), using default", raw);
                DEFAULT_PORT
            }),
            Err(_) => {
                warn!("PORT not set, using default");
                DEFAULT_PORT
            }
        };

        let config = Self {
            port,
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            database_api_key: env_or("DATABASE_API_KEY", ""),
            database_name: env_or("DATABASE_NAME", DEFAULT_DATABASE_NAME),
            jwt_secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            aws_region: env_or("AWS_REGION", DEFAULT_AWS_REGION),
            aws_access_key: env_or("AWS_ACCESS_KEY", ""),
            aws_secret_key: env_or("AWS_SECRET_KEY", ""),
            s3_bucket: env_or("S3_BUCKET", DEFAULT_S3_BUCKET),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
        };

        if config.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT_SECRET is the built-in default; tokens are not safe outside development");
        }

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.database_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_ai_configured(&self) -> bool {
        !self.gemini_api_key.is_empty() && !self.gemini_model.is_empty()
    }

    pub fn is_storage_configured(&self) -> bool {
        !self.aws_access_key.is_empty()
            && !self.aws_secret_key.is_empty()
            && !self.s3_bucket.is_empty()
    }
}
