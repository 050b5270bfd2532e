use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use doctor_cell::services::seed::{persona_rows, real_doctor_rows};
use doctor_cell::services::seed_directory;
use shared_utils::test_utils::{InMemoryPostgrest, MockRows, TestConfig};

async fn seeded_app() -> (Router, InMemoryPostgrest, MockServer) {
    let server = MockServer::start().await;
    let store = InMemoryPostgrest::new()
        .with_rows("doctors", persona_rows())
        .with_rows("real_doctors", real_doctor_rows());
    store.mount(&server).await;

    let router = doctor_routes(TestConfig::with_server_uri(&server.uri()).to_arc());
    (router, store, server)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_list_ai_doctors_hides_prompts() {
    let (app, _store, _server) = seeded_app().await;

    let (status, body) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    let doctors = body["doctors"].as_array().unwrap();
    assert_eq!(doctors.len(), 6);
    assert!(doctors.iter().all(|d| d.get("prompt").is_none()));
    assert!(doctors.iter().all(|d| d["is_ai"] == true));
}

#[tokio::test]
async fn test_get_doctor_by_id() {
    let (app, _store, _server) = seeded_app().await;

    let (status, body) = get(&app, "/cardiologist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Dr. Michael Rodriguez");

    let (status, body) = get(&app, "/astrologer").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Doctor not found");
}

#[tokio::test]
async fn test_real_doctors_filter_by_specialty() {
    let (app, _store, _server) = seeded_app().await;

    let (status, body) = get(&app, "/real").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctors"].as_array().unwrap().len(), 6);

    let (status, body) = get(&app, "/real?specialty=Orthopedic%20Surgeon").await;
    assert_eq!(status, StatusCode::OK);
    let doctors = body["doctors"].as_array().unwrap();
    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0]["name"], "Dr. Sandra Johnson");

    let (_, body) = get(&app, "/real?specialty=Astrologer").await;
    assert!(body["doctors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_database_failure_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let app = doctor_routes(TestConfig::with_server_uri(&server.uri()).to_arc());
    let (status, body) = get(&app, "/").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("upstream down"));
}

#[tokio::test]
async fn test_seed_populates_empty_tables_once() {
    let server = MockServer::start().await;
    let store = InMemoryPostgrest::new();
    store.mount(&server).await;
    let config = TestConfig::with_server_uri(&server.uri()).to_app_config();

    seed_directory(&config).await;
    seed_directory(&config).await;

    assert_eq!(store.rows("doctors").len(), 6);
    assert_eq!(store.rows("real_doctors").len(), 6);
}

#[tokio::test]
async fn test_seed_leaves_populated_tables_alone() {
    let server = MockServer::start().await;
    let store = InMemoryPostgrest::new().with_rows(
        "doctors",
        vec![MockRows::persona("custom", "Dr. Custom", "Generalist")],
    );
    store.mount(&server).await;

    seed_directory(&TestConfig::with_server_uri(&server.uri()).to_app_config()).await;

    assert_eq!(store.rows("doctors").len(), 1);
    assert_eq!(store.rows("real_doctors").len(), 6);
}
