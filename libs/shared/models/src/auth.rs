use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: Option<String>,
    pub iat: Option<u64>,
    pub exp: Option<u64>,
}

/// Identity of the caller, decoded from a validated bearer token and placed
/// in the request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}
