use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{InMemoryPostgrest, MockRows, TestConfig, TestUser};

struct TestApp {
    router: Router,
    store: InMemoryPostgrest,
    user: TestUser,
    secret: String,
    doctor_id: String,
    _server: MockServer,
}

impl TestApp {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let doctor_id = Uuid::new_v4().to_string();
        let store = InMemoryPostgrest::new().with_rows(
            "real_doctors",
            vec![MockRows::real_doctor(&doctor_id, "Dr. Jennifer Martinez", "Cardiologist")],
        );
        store.mount(&server).await;

        let config = TestConfig::with_server_uri(&server.uri());

        Self {
            router: appointment_routes(config.to_arc()),
            store,
            user: TestUser::default(),
            secret: config.jwt_secret.clone(),
            doctor_id,
            _server: server,
        }
    }

    async fn call_as(&self, user: &TestUser, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", user.bearer(&self.secret));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call_as(&self.user, method, uri, body).await
    }

    fn booking(&self) -> Value {
        json!({
            "real_doctor_id": self.doctor_id,
            "appointment_date": "2030-03-01T09:30:00Z",
            "symptoms": "intermittent chest pain",
            "ai_recommendation": "See a cardiologist"
        })
    }

    fn session_row(&self, owner: &TestUser) -> (String, Value) {
        let id = Uuid::new_v4().to_string();
        let row = json!({
            "id": id,
            "user_id": owner.id,
            "doctor_id": "cardiologist",
            "messages": [],
            "status": "doctor_recommended",
            "active_key": null,
            "version": 2,
            "created_at": Utc::now(),
            "updated_at": Utc::now()
        });
        (id, row)
    }
}

#[tokio::test]
async fn test_valid_booking_is_pending() {
    let app = TestApp::new().await;

    let (status, body) = app.call("POST", "/", Some(app.booking())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["user_id"], app.user.id);
    assert_eq!(body["real_doctor_id"], app.doctor_id);
    assert_eq!(body["symptoms"], "intermittent chest pain");
    assert!(body["chat_session_id"].is_null());
    assert_eq!(app.store.rows("appointments").len(), 1);
}

#[tokio::test]
async fn test_booking_unknown_doctor_fails() {
    let app = TestApp::new().await;
    let mut booking = app.booking();
    booking["real_doctor_id"] = json!(Uuid::new_v4().to_string());

    let (status, body) = app.call("POST", "/", Some(booking)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Doctor not found");
    assert!(app.store.rows("appointments").is_empty());
}

#[tokio::test]
async fn test_booking_validation() {
    let app = TestApp::new().await;

    let mut bad_doctor = app.booking();
    bad_doctor["real_doctor_id"] = json!("not-a-uuid");
    let (status, body) = app.call("POST", "/", Some(bad_doctor)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid real doctor ID");

    let mut bad_date = app.booking();
    bad_date["appointment_date"] = json!("next tuesday");
    let (status, _) = app.call("POST", "/", Some(bad_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut no_date = app.booking();
    no_date.as_object_mut().unwrap().remove("appointment_date");
    let (status, body) = app.call("POST", "/", Some(no_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "appointment_date is required");

    let (status, body) = app.call("POST", "/?chat_session_id=xyz", Some(app.booking())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid chat session ID");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", app.user.bearer(&app.secret))
        .body(Body::from(app.booking().to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());

    let mut wrong_type = app.booking();
    wrong_type["symptoms"] = json!(["cough"]);
    let (status, body) = app.call("POST", "/", Some(wrong_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, created) = app.call("POST", "/", Some(app.booking())).await;
    let (status, body) = app
        .call("PUT", &format!("/{}/status", created["id"].as_str().unwrap()), Some(json!({ "status": 3 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(app.store.rows("appointments").len(), 1);
}

#[tokio::test]
async fn test_booking_links_own_chat_session() {
    let app = TestApp::new().await;
    let (session_id, row) = app.session_row(&app.user);
    let app = TestApp {
        store: app.store.clone().with_rows("chat_sessions", vec![row]),
        ..app
    };

    let (status, body) = app
        .call("POST", &format!("/?chat_session_id={}", session_id), Some(app.booking()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["chat_session_id"], session_id);

    let mut in_body = app.booking();
    in_body["chat_session_id"] = json!(session_id);
    let (status, body) = app.call("POST", "/", Some(in_body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["chat_session_id"], session_id);
}

#[tokio::test]
async fn test_booking_with_someone_elses_session_fails() {
    let app = TestApp::new().await;
    let stranger = TestUser::new("stranger@example.com", "Stranger");
    let (session_id, row) = app.session_row(&stranger);
    let app = TestApp {
        store: app.store.clone().with_rows("chat_sessions", vec![row]),
        ..app
    };

    let mut booking = app.booking();
    booking["chat_session_id"] = json!(session_id);
    let (status, body) = app.call("POST", "/", Some(booking)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Chat session not found");
}

#[tokio::test]
async fn test_list_and_get_are_scoped_to_caller() {
    let app = TestApp::new().await;
    let (_, created) = app.call("POST", "/", Some(app.booking())).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app.call("GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"].as_array().unwrap().len(), 1);

    let (status, body) = app.call("GET", &format!("/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let other = TestUser::new("other@example.com", "Other");
    let (status, _) = app.call_as(&other, "GET", &format!("/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.call_as(&other, "GET", "/", None).await;
    assert!(body["appointments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_status() {
    let app = TestApp::new().await;
    let (_, created) = app.call("POST", "/", Some(app.booking())).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .call("PUT", &format!("/{}/status", id), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment status updated successfully");

    let (_, fetched) = app.call("GET", &format!("/{}", id), None).await;
    assert_eq!(fetched["status"], "confirmed");

    // any status may follow any other
    let (status, _) = app
        .call("PUT", &format!("/{}/status", id), Some(json!({ "status": "pending" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call("PUT", &format!("/{}/status", id), Some(json!({ "status": "teleported" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call("PUT", &format!("/{}/status", Uuid::new_v4()), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("PUT", "/nope/status", Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_requires_authentication() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
