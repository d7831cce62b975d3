//! End-to-end authentication flows against a mock backend
//!
//! Every test wires the production stack (reqwest transport, cookie jar,
//! in-memory credential store, broadcast redirect) through `build_client`.

use std::time::Duration;

use futures::future::join_all;
use lessonlink_domain::{
    ApiError, Config, ErrorKind, LoginCredentials, RequestOptions, Session, StorageBackend,
};
use lessonlink_infra::{build_client, ClientHandle, SessionEvent};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFRESH_PATH: &str = "/api/auth/token/refresh/";
const LESSONS_PATH: &str = "/api/lessons/";

fn client_for(server: &MockServer) -> ClientHandle {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api", server.uri());
    config.api.logout_path = Some("/auth/logout/".to_string());
    config.storage.backend = StorageBackend::Memory;
    build_client(&config).expect("client should build")
}

fn seed(handle: &ClientHandle, access: &str, refresh: Option<&str>) {
    handle.client().store().set(Session::authenticated(access, refresh.map(String::from), None));
}

async fn mount_lessons(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LESSONS_PATH))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(LESSONS_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is expired"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_then_authenticated_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .and(body_json(json!({"email": "ada@example.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "A1",
            "refresh": "R1",
            "user": {"id": 7, "email": "ada@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LESSONS_PATH))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let client = handle.client();

    let login = client.login(&LoginCredentials::new("ada@example.com", "secret")).await;
    assert!(login.success);
    assert_eq!(client.session().access_token(), Some("A1"));
    assert_eq!(client.session().refresh_token(), Some("R1"));
    assert_eq!(client.current_user().unwrap()["id"], 7);

    let lessons = client.get("/lessons/", RequestOptions::default()).await;
    assert!(lessons.success);
    assert_eq!(lessons.status, 200);

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_rejected_reports_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let response =
        handle.client().login(&LoginCredentials::new("ada@example.com", "wrong")).await;

    assert!(!response.success);
    assert_eq!(response.status, 401);
    assert_eq!(
        response.error_message.as_deref(),
        Some("No active account found with the given credentials")
    );
    assert!(!handle.client().is_authenticated());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried() {
    let server = MockServer::start().await;
    mount_lessons(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A2", "refresh": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    seed(&handle, "A1", Some("R1"));

    let response = handle.client().get("/lessons/", RequestOptions::default()).await;

    assert!(response.success, "{response:?}");
    assert_eq!(response.data.as_json(), Some(&json!([{"id": 1}])));
    let session = handle.client().session();
    assert_eq!(session.access_token(), Some("A2"));
    assert_eq!(session.refresh_token(), Some("R2"));
}

#[tokio::test]
async fn test_concurrent_expiries_share_one_refresh() {
    let server = MockServer::start().await;
    mount_lessons(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    seed(&handle, "A1", Some("R1"));

    let requests = (0..10).map(|_| {
        let client = handle.client().clone();
        async move { client.get("/lessons/", RequestOptions::default()).await }
    });
    let responses = join_all(requests).await;

    assert!(responses.iter().all(|response| response.success), "{responses:?}");
    assert_eq!(handle.client().refresher().refresh_count(), 1);
    // The refresh token was not rotated, so the old one is kept
    assert_eq!(handle.client().session().refresh_token(), Some("R1"));
}

#[tokio::test]
async fn test_rejected_refresh_expires_session_for_every_caller() {
    let server = MockServer::start().await;
    mount_lessons(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Token is invalid or expired"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let mut events = handle.subscribe();
    seed(&handle, "A1", Some("R1"));

    let requests = (0..5).map(|_| {
        let client = handle.client().clone();
        async move { client.get("/lessons/", RequestOptions::default()).await }
    });
    let responses = join_all(requests).await;

    for response in &responses {
        assert!(response.is_session_expired(), "{response:?}");
        assert_eq!(response.status, 401);
        assert_eq!(response.error, Some(ApiError::SessionExpired));
    }
    assert!(!handle.client().is_authenticated());
    assert_eq!(handle.client().session(), Session::empty());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired { login_path: "/login".to_string() }
    );
}

#[tokio::test]
async fn test_missing_refresh_token_skips_refresh_call() {
    let server = MockServer::start().await;
    mount_lessons(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(0)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let mut events = handle.subscribe();
    seed(&handle, "A1", None);

    let response = handle.client().get("/lessons/", RequestOptions::default()).await;

    assert_eq!(response.error_kind(), Some(ErrorKind::SessionExpired));
    assert!(!handle.client().is_authenticated());
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Expired { .. })));
}

#[tokio::test]
async fn test_skip_auth_request_sends_no_bearer_and_never_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/password-reset/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Not allowed"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    seed(&handle, "A1", Some("R1"));

    let response = handle
        .client()
        .post(
            "/auth/password-reset/",
            json!({"email": "ada@example.com"}),
            RequestOptions::skip_auth(),
        )
        .await;

    assert!(!response.success);
    assert_eq!(response.status, 401);
    assert_eq!(response.error_kind(), Some(ErrorKind::Backend));
    assert_eq!(response.error_message.as_deref(), Some("Not allowed"));
    // The stored session is untouched
    assert_eq!(handle.client().session().access_token(), Some("A1"));

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_logout_twice_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(205))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    seed(&handle, "A1", Some("R1"));

    handle.client().logout().await;
    handle.client().logout().await;

    assert_eq!(handle.client().session(), Session::empty());
    assert_eq!(handle.client().current_user(), None);
}

#[tokio::test]
async fn test_csrf_cookie_is_echoed_as_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf/"))
        .respond_with(
            ResponseTemplate::new(204).insert_header("set-cookie", "csrftoken=tok123; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LESSONS_PATH))
        .and(header("X-CSRFToken", "tok123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let client = handle.client();

    assert!(client.get("/auth/csrf/", RequestOptions::skip_auth()).await.success);
    let created = client.post("/lessons/", json!({"title": "Fractions"}), RequestOptions::default()).await;

    assert!(created.success, "{created:?}");
    assert_eq!(created.status, 201);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    let mut config = Config::default();
    config.api.base_url = "http://127.0.0.1:1/api".to_string();
    config.storage.backend = StorageBackend::Memory;
    let handle = build_client(&config).unwrap();

    let response = handle.client().get("/lessons/", RequestOptions::default()).await;

    assert!(!response.success);
    assert_eq!(response.status, 0);
    assert_eq!(response.error_kind(), Some(ErrorKind::Network));
}

#[tokio::test]
async fn test_malformed_success_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LESSONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let response = handle.client().get("/lessons/", RequestOptions::default()).await;

    assert!(!response.success);
    assert_eq!(response.status, 200);
    match response.error {
        Some(ApiError::MalformedResponse { raw, .. }) => assert_eq!(raw, "{not json"),
        other => panic!("expected malformed response, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_expiry_refresh_and_profile_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .and(body_json(json!({"email": "a@b.com", "password": "x"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "email": "a@b.com"})),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server);
    let client = handle.client();

    assert!(client.login(&LoginCredentials::new("a@b.com", "x")).await.success);
    let profile = client.fetch_current_user().await;

    assert!(profile.success, "{profile:?}");
    assert_eq!(profile.data.as_json(), Some(&json!({"id": 1, "email": "a@b.com"})));
    assert_eq!(client.session().access_token(), Some("A2"));
    assert_eq!(client.current_user().unwrap()["email"], "a@b.com");
    assert_eq!(client.refresher().refresh_count(), 1);
}
