//! Integration tests for the full magic-link flow.
//!
//! A small in-process auth service is served with `axum` on a random port,
//! and a real `MikroAuthClient` (HTTP endpoint + storage) is driven
//! against it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mikroauth::prelude::*;
use serde_json::{Value, json};

// =========================================================================
// Mock auth service
// =========================================================================

#[derive(Default)]
struct Service {
    /// Lifetime handed out with each token pair, in seconds.
    expires_in: u64,
    issued: u64,
    links_sent: Vec<String>,
    magic_tokens: HashSet<String>,
    access_tokens: HashSet<String>,
    refresh_tokens: HashSet<String>,
    refresh_calls: u64,
    logout_calls: u64,
}

impl Service {
    fn issue_pair(&mut self, email: &str) -> Value {
        self.issued += 1;
        let claims = json!({
            "sub": email,
            "lastLogin": 1_700_000_000,
            "metadata": { "plan": "free" },
        });
        let access = format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.sig{}",
            URL_SAFE_NO_PAD.encode(claims.to_string()),
            self.issued
        );
        let refresh = format!("refresh-{}-{email}", self.issued);
        self.access_tokens.insert(access.clone());
        self.refresh_tokens.insert(refresh.clone());
        json!({
            "accessToken": access,
            "refreshToken": refresh,
            "expiresIn": self.expires_in,
        })
    }
}

type Shared = Arc<Mutex<Service>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message })))
}

async fn login(State(svc): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut svc = svc.lock().unwrap();
    svc.magic_tokens.insert(format!("magic-{email}"));
    svc.links_sent.push(email);
    Json(json!({ "message": "Magic link sent" }))
}

async fn verify(
    State(svc): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut svc = svc.lock().unwrap();
    let presented = bearer(&headers).unwrap_or_default();
    if presented != format!("magic-{email}") || !svc.magic_tokens.remove(&presented) {
        return unauthorized("Invalid or expired token");
    }
    (StatusCode::OK, Json(svc.issue_pair(&email)))
}

async fn refresh(State(svc): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let token = body["refreshToken"].as_str().unwrap_or_default().to_string();
    let mut svc = svc.lock().unwrap();
    svc.refresh_calls += 1;
    if !svc.refresh_tokens.remove(&token) {
        return unauthorized("Invalid refresh token");
    }
    let email = token.splitn(3, '-').nth(2).unwrap_or_default().to_string();
    (StatusCode::OK, Json(svc.issue_pair(&email)))
}

async fn logout(
    State(svc): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut svc = svc.lock().unwrap();
    svc.logout_calls += 1;
    let access = bearer(&headers).unwrap_or_default();
    if !svc.access_tokens.remove(&access) {
        return unauthorized("Invalid access token");
    }
    if let Some(token) = body["refreshToken"].as_str() {
        svc.refresh_tokens.remove(token);
    }
    (StatusCode::OK, Json(json!({ "message": "Logged out" })))
}

async fn sessions(State(svc): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let svc = svc.lock().unwrap();
    let access = bearer(&headers).unwrap_or_default();
    if !svc.access_tokens.contains(&access) {
        return unauthorized("Invalid access token");
    }
    (
        StatusCode::OK,
        Json(json!({ "sessions": [{ "id": "current", "device": "test" }] })),
    )
}

/// Starts the mock service on a random port and returns its base URL.
async fn start_service(expires_in: u64) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Service {
        expires_in,
        ..Service::default()
    }));

    let router = Router::new()
        .route("/login", post(login))
        .route("/verify", post(verify))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/sessions", get(sessions))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have local addr");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    (format!("http://{addr}"), state)
}

fn client<S: Storage>(base_url: &str, storage: S) -> MikroAuthClient<S> {
    MikroAuth::builder()
        .base_url(base_url)
        .build(storage)
        .expect("client should build")
}

fn link_for(email: &str) -> UrlLocation {
    UrlLocation::parse(&format!(
        "myapp://signin?token=magic-{email}&email={email}&next=home"
    ))
    .expect("valid url")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_full_sign_in_and_out() {
    let (url, svc) = start_service(3600).await;
    let auth = client(&url, MemoryStorage::new());

    let ack = auth.request_link("ada@example.com").await.expect("link sent");
    assert_eq!(ack["message"], "Magic link sent");
    assert_eq!(svc.lock().unwrap().links_sent, vec!["ada@example.com"]);

    let location = link_for("ada@example.com");
    assert!(auth.handle_incoming_link(&location).await);
    assert_eq!(location.current().as_str(), "myapp://signin?next=home");

    assert!(auth.is_authenticated().await);
    let who = auth.get_identity().await.expect("claims");
    assert_eq!(who.subject_email.as_deref(), Some("ada@example.com"));
    assert_eq!(who.metadata["plan"], "free");

    let listing = auth.get_sessions().await.expect("sessions");
    assert_eq!(listing["sessions"][0]["id"], "current");

    let outcome = auth.logout().await.expect("logout");
    assert_eq!(outcome, LogoutOutcome::Remote(json!({ "message": "Logged out" })));
    assert!(!auth.is_authenticated().await);
    assert_eq!(auth.session_state().await.unwrap(), SessionState::Absent);
}

#[tokio::test]
async fn test_magic_link_is_single_use() {
    let (url, _svc) = start_service(3600).await;
    let auth = client(&url, MemoryStorage::new());
    auth.request_link("ada@example.com").await.unwrap();

    auth.verify_link("magic-ada@example.com", "ada@example.com")
        .await
        .expect("first use");
    auth.clear_session().await.unwrap();

    let err = auth
        .verify_link("magic-ada@example.com", "ada@example.com")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::VerificationFailed("Invalid or expired token".into())
    );
    assert_eq!(auth.get_tokens().await.unwrap(), None);
}

#[tokio::test]
async fn test_short_lived_token_is_refreshed_silently() {
    // Lifetime below the 10s skew: every pair is expired on arrival.
    let (url, svc) = start_service(5).await;
    let auth = client(&url, MemoryStorage::new());
    auth.request_link("ada@example.com").await.unwrap();
    auth.verify_link("magic-ada@example.com", "ada@example.com")
        .await
        .unwrap();
    let first = auth.get_refresh_token().await.unwrap();

    assert!(auth.is_expired().await);
    assert!(auth.is_authenticated().await);

    assert_eq!(svc.lock().unwrap().refresh_calls, 1);
    assert_ne!(auth.get_refresh_token().await.unwrap(), first);
}

#[tokio::test]
async fn test_sessions_recovers_from_revoked_access_token() {
    let (url, svc) = start_service(3600).await;
    let auth = client(&url, MemoryStorage::new());
    auth.request_link("ada@example.com").await.unwrap();
    auth.verify_link("magic-ada@example.com", "ada@example.com")
        .await
        .unwrap();

    svc.lock().unwrap().access_tokens.clear();

    let listing = auth.get_sessions().await.expect("retry after refresh");
    assert_eq!(listing["sessions"][0]["device"], "test");
    assert_eq!(svc.lock().unwrap().refresh_calls, 1);
}

#[tokio::test]
async fn test_revoked_refresh_token_signs_out() {
    let (url, svc) = start_service(5).await;
    let auth = client(&url, MemoryStorage::new());
    auth.request_link("ada@example.com").await.unwrap();
    auth.verify_link("magic-ada@example.com", "ada@example.com")
        .await
        .unwrap();

    svc.lock().unwrap().refresh_tokens.clear();

    assert!(!auth.is_authenticated().await);
    assert_eq!(auth.get_tokens().await.unwrap(), None);
}

#[tokio::test]
async fn test_logout_without_session_stays_local() {
    let (url, svc) = start_service(3600).await;
    let auth = client(&url, MemoryStorage::new());

    assert_eq!(auth.logout().await.unwrap(), LogoutOutcome::LocalOnly);
    assert_eq!(svc.lock().unwrap().logout_calls, 0);
}

#[tokio::test]
async fn test_session_survives_restart_with_file_storage() {
    let (url, svc) = start_service(3600).await;
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let auth = client(&url, FileStorage::new(dir.path()));
        auth.request_link("ada@example.com").await.unwrap();
        assert!(auth.handle_incoming_link(&link_for("ada@example.com")).await);
    }

    let restarted = client(&url, FileStorage::new(dir.path()));
    assert!(restarted.is_authenticated().await);
    assert_eq!(
        restarted
            .get_identity()
            .await
            .and_then(|c| c.subject_email)
            .as_deref(),
        Some("ada@example.com")
    );
    assert_eq!(svc.lock().unwrap().refresh_calls, 0);
}

#[tokio::test]
async fn test_unreachable_service_reports_fallback_message() {
    let auth = client("http://127.0.0.1:9", MemoryStorage::new());

    let err = auth.request_link("ada@example.com").await.unwrap_err();
    assert_eq!(
        err,
        SessionError::RequestFailed("Failed to request magic link".into())
    );
}
