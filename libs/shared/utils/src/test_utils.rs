use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub server_uri: String,
    pub api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            server_uri: "http://localhost:54321".to_string(),
            api_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the database, Gemini and S3 endpoints at one mock server.
    pub fn with_server_uri(uri: &str) -> Self {
        Self {
            server_uri: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            port: 0,
            database_url: self.server_uri.clone(),
            database_api_key: self.api_key.clone(),
            database_name: "public".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            gemini_api_key: "test-gemini-key".to_string(),
            gemini_model: "gemini-test".to_string(),
            gemini_base_url: format!("{}/v1beta", self.server_uri),
            aws_region: "us-east-1".to_string(),
            aws_access_key: "AKIDEXAMPLE".to_string(),
            aws_secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            s3_bucket: "test-bucket".to_string(),
            s3_endpoint: Some(self.server_uri.clone()),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "Test User")
    }
}

impl TestUser {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            issued_at: Some(Utc::now()),
        }
    }

    pub fn bearer(&self, secret: &str) -> String {
        format!("Bearer {}", JwtTestUtils::create_test_token(self, secret, Some(24)))
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockRows;

impl MockRows {
    pub fn persona(id: &str, name: &str, specialty: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialty": specialty,
            "description": format!("{} persona", specialty),
            "avatar": "https://images.example.com/avatar.png",
            "is_ai": true,
            "prompt": format!("You are {}, a {} AI assistant.", name, specialty.to_lowercase())
        })
    }

    pub fn real_doctor(id: &str, name: &str, specialty: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialty": specialty,
            "hospital": "General Hospital",
            "experience": 10,
            "rating": 4.5,
            "availability": ["Monday", "Wednesday"],
            "created_at": Utc::now().to_rfc3339()
        })
    }

    /// Minimal successful `generateContent` payload.
    pub fn gemini_reply(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": text }]
                },
                "finishReason": "STOP"
            }]
        })
    }
}

/// Stateful stand-in for the PostgREST subset the services use: `eq.`
/// filters, `order`, `limit`, inserts with optional `on_conflict` +
/// `resolution=ignore-duplicates`, and patches returning the representation.
#[derive(Clone, Default)]
pub struct InMemoryPostgrest {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    unique: Arc<Mutex<Vec<(String, String)>>>,
}

const RESERVED_PARAMS: [&str; 4] = ["select", "order", "limit", "on_conflict"];

impl InMemoryPostgrest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    /// Rejects inserts that repeat a non-null value in `column`, like a
    /// unique constraint would.
    pub fn with_unique(self, table: &str, column: &str) -> Self {
        self.unique
            .lock()
            .unwrap()
            .push((table.to_string(), column.to_string()));
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(path_regex(r"^/rest/v1/[a-z_]+$"))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    fn cell_matches(row: &Value, column: &str, expected: &str) -> bool {
        match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Null) | None => expected == "null",
            Some(other) => other.to_string() == expected,
        }
    }

    fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (Some(Value::String(x)), Some(Value::String(y))) => {
                match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                }
            }
            (Some(Value::Number(x)), Some(Value::Number(y))) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }

    fn filters(params: &[(String, String)]) -> Vec<(String, String)> {
        params
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .filter_map(|(key, value)| {
                value
                    .strip_prefix("eq.")
                    .map(|v| (key.clone(), v.to_string()))
            })
            .collect()
    }

    fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn select(&self, table: &str, params: &[(String, String)]) -> ResponseTemplate {
        let filters = Self::filters(params);
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(column, expected)| Self::cell_matches(row, column, expected))
            })
            .collect();

        if let Some(order) = Self::param(params, "order") {
            let (column, direction) = order.split_once('.').unwrap_or((order, "asc"));
            rows.sort_by(|a, b| Self::compare(a.get(column), b.get(column)));
            if direction == "desc" {
                rows.reverse();
            }
        }

        if let Some(limit) = Self::param(params, "limit").and_then(|l| l.parse::<usize>().ok()) {
            rows.truncate(limit);
        }

        ResponseTemplate::new(200).set_body_json(Value::Array(rows))
    }

    fn insert(&self, table: &str, params: &[(String, String)], request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(e) => return ResponseTemplate::new(400).set_body_json(json!({ "message": e.to_string() })),
        };
        let incoming = match body {
            Value::Array(rows) => rows,
            row => vec![row],
        };

        let ignore_duplicates = request
            .headers
            .get("Prefer")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("resolution=ignore-duplicates"))
            .unwrap_or(false);
        let on_conflict = Self::param(params, "on_conflict").map(str::to_string);

        let unique_columns: Vec<String> = self
            .unique
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, c)| c.clone())
            .collect();

        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        let mut inserted = Vec::new();

        for row in incoming {
            let collides = |column: &str| {
                match row.get(column) {
                    Some(Value::Null) | None => false,
                    Some(value) => stored.iter().any(|existing| existing.get(column) == Some(value)),
                }
            };

            if let Some(column) = on_conflict.as_deref() {
                if collides(column) {
                    if ignore_duplicates {
                        continue;
                    }
                    return ResponseTemplate::new(409).set_body_json(json!({
                        "code": "23505",
                        "message": format!("duplicate key value violates unique constraint on {}", column)
                    }));
                }
            }

            if let Some(column) = unique_columns.iter().find(|c| collides(c.as_str())) {
                return ResponseTemplate::new(409).set_body_json(json!({
                    "code": "23505",
                    "message": format!("duplicate key value violates unique constraint on {}", column)
                }));
            }

            stored.push(row.clone());
            inserted.push(row);
        }

        ResponseTemplate::new(201).set_body_json(Value::Array(inserted))
    }

    fn update(&self, table: &str, params: &[(String, String)], request: &Request) -> ResponseTemplate {
        let patch = match serde_json::from_slice::<Value>(&request.body) {
            Ok(Value::Object(patch)) => patch,
            _ => return ResponseTemplate::new(400).set_body_json(json!({ "message": "patch body must be an object" })),
        };
        let filters = Self::filters(params);

        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();

        for row in stored.iter_mut() {
            let matched = filters
                .iter()
                .all(|(column, expected)| Self::cell_matches(row, column, expected));
            if !matched {
                continue;
            }
            if let Some(object) = row.as_object_mut() {
                for (key, value) in &patch {
                    object.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }

        ResponseTemplate::new(200).set_body_json(Value::Array(updated))
    }
}

impl Respond for InMemoryPostgrest {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let table = request
            .url
            .path()
            .trim_start_matches("/rest/v1/")
            .to_string();
        let params: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();

        match request.method.as_str() {
            "GET" => self.select(&table, &params),
            "POST" => self.insert(&table, &params, request),
            "PATCH" => self.update(&table, &params, request),
            _ => ResponseTemplate::new(405),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_points_everything_at_server() {
        let config = TestConfig::with_server_uri("http://127.0.0.1:9999").to_app_config();

        assert_eq!(config.database_url, "http://127.0.0.1:9999");
        assert_eq!(config.gemini_base_url, "http://127.0.0.1:9999/v1beta");
        assert_eq!(config.s3_endpoint.as_deref(), Some("http://127.0.0.1:9999"));
        assert!(config.is_configured());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
        let validated = crate::jwt::validate_token(&token, "test-secret").unwrap();
        assert_eq!(validated.id, user.id);
    }

    #[tokio::test]
    async fn test_in_memory_postgrest_round_trip() {
        let server = MockServer::start().await;
        let store = InMemoryPostgrest::new().with_unique("users", "email");
        store.mount(&server).await;

        let client = reqwest::Client::new();
        let created = client
            .post(format!("{}/rest/v1/users", server.uri()))
            .json(&json!({"id": "1", "email": "a@example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status().as_u16(), 201);

        let duplicate = client
            .post(format!("{}/rest/v1/users", server.uri()))
            .json(&json!({"id": "2", "email": "a@example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(duplicate.status().as_u16(), 409);

        let found: Vec<Value> = client
            .get(format!("{}/rest/v1/users?email=eq.a%40example.com&limit=1", server.uri()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], "1");
    }
}
