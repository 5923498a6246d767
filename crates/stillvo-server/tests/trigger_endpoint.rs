// crates/stillvo-server/tests/trigger_endpoint.rs
// ============================================================================
// Module: Trigger Endpoint Tests
// Description: End-to-end tests for the digest trigger and health routes.
// Purpose: Validate authorization, cycle reporting, and failure mapping.
// Dependencies: stillvo-server, stillvo-core, axum, tokio, reqwest
// ============================================================================

//! ## Overview
//! Spins up the real router on an ephemeral port and drives it over HTTP:
//! - Missing or wrong credentials are rejected with 401 and no side effects
//! - Bearer header and query token both authorize a cycle
//! - Repeat triggers on the same day report skips instead of resending
//! - An empty day returns the no-items note
//! - A transport failure maps to 502 and frees the reservation for retry

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use stillvo_core::AckKind;
use stillvo_core::DigestDispatcher;
use stillvo_core::InMemoryDigestStore;
use stillvo_core::MailTransport;
use stillvo_core::OutboundEmail;
use stillvo_core::Timestamp;
use stillvo_core::TransportError;
use stillvo_core::UserId;
use stillvo_config::MailConfig;
use stillvo_config::ServerConfig;
use stillvo_config::StillvoConfig;
use stillvo_config::StoreConfig;
use stillvo_server::DigestServer;
use stillvo_server::DigestServerError;
use stillvo_server::NoopAuditSink;
use stillvo_server::ServerState;
use stillvo_server::TriggerAuth;
use stillvo_server::build_router;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const SECRET: &str = "super-secret-trigger-token";
const FROM: &str = "digest@stillvo.test";

/// Transport that records sent emails and fails the first `fail_first` calls.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_first: AtomicUsize,
    calls: AtomicUsize,
}

impl RecordingTransport {
    fn failing_first(count: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("transport mutex").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        self.sent.lock().expect("transport mutex").push(email.clone());
        Ok(())
    }
}

fn now_millis() -> i64 {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock");
    i64::try_from(elapsed.as_millis()).expect("clock range")
}

fn seed_recipient(store: &InMemoryDigestStore, name: &str, email: Option<&str>, kinds: &[AckKind]) {
    let user = UserId::new(name);
    store.set_profile(&user, email).expect("seed profile");
    for kind in kinds {
        store
            .push_event(&user, *kind, Timestamp::from_unix_millis(now_millis()))
            .expect("seed event");
    }
}

/// Serves the router on an ephemeral port, returning the base URL.
async fn start_server(store: &InMemoryDigestStore, transport: &Arc<RecordingTransport>) -> String {
    let dispatcher = DigestDispatcher::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(transport) as Arc<dyn MailTransport>,
        FROM,
    );
    let state = ServerState::new(
        TriggerAuth::new(SECRET),
        dispatcher,
        Arc::new(store.clone()),
        Arc::new(NoopAuditSink),
        SECRET,
    );
    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn json_body(response: reqwest::Response) -> serde_json::Value {
    response.json::<serde_json::Value>().await.expect("json body")
}

// ============================================================================
// SECTION: Authorization Tests
// ============================================================================

#[tokio::test]
async fn trigger_without_credential_is_rejected() {
    let store = InMemoryDigestStore::new();
    seed_recipient(&store, "ada", Some("ada@example.com"), &[AckKind::Read]);
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;

    let response = reqwest::get(format!("{base}/api/digest/send")).await.expect("request");
    assert_eq!(response.status().as_u16(), 401);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.reservation_count().expect("count"), 0);
}

#[tokio::test]
async fn trigger_with_wrong_secret_is_rejected() {
    let store = InMemoryDigestStore::new();
    seed_recipient(&store, "ada", Some("ada@example.com"), &[AckKind::Read]);
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/digest/send?token=not-the-secret"))
        .bearer_auth("also-not-the-secret")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// SECTION: Cycle Tests
// ============================================================================

#[tokio::test]
async fn bearer_trigger_runs_one_cycle() {
    let store = InMemoryDigestStore::new();
    seed_recipient(
        &store,
        "ada",
        Some("ada@example.com"),
        &[AckKind::Read, AckKind::Resonated],
    );
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/digest/send"))
        .bearer_auth(SECRET)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["skippedAlreadySent"], 0);
    assert_eq!(body["skippedNoEmail"], 0);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "Your Stillvo digest");
}

#[tokio::test]
async fn query_token_trigger_is_accepted() {
    let store = InMemoryDigestStore::new();
    seed_recipient(&store, "ada", Some("ada@example.com"), &[AckKind::ThankYou]);
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/api/digest/send?token={SECRET}"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(body["sent"], 1);
}

#[tokio::test]
async fn second_trigger_same_day_reports_already_sent() {
    let store = InMemoryDigestStore::new();
    seed_recipient(&store, "ada", Some("ada@example.com"), &[AckKind::Read]);
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/api/digest/send");

    let first = client.post(&url).bearer_auth(SECRET).send().await.expect("first");
    assert_eq!(json_body(first).await["sent"], 1);

    let second = client.post(&url).bearer_auth(SECRET).send().await.expect("second");
    let body = json_body(second).await;
    assert_eq!(body["sent"], 0);
    assert_eq!(body["skippedAlreadySent"], 1);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn empty_day_returns_no_items_note() {
    let store = InMemoryDigestStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/digest/send"))
        .bearer_auth(SECRET)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["sent"], 0);
    assert_eq!(body["note"], "No digest items today");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn transport_failure_returns_bad_gateway_and_frees_the_slot() {
    let store = InMemoryDigestStore::new();
    seed_recipient(&store, "ada", Some("ada@example.com"), &[AckKind::Read]);
    let transport = Arc::new(RecordingTransport::failing_first(1));
    let base = start_server(&store, &transport).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/api/digest/send");

    let failed = client.post(&url).bearer_auth(SECRET).send().await.expect("failed trigger");
    assert_eq!(failed.status().as_u16(), 502);
    assert_eq!(store.reservation_count().expect("count"), 0);

    // A retry within the same day reserves and delivers.
    let retry = client.post(&url).bearer_auth(SECRET).send().await.expect("retry trigger");
    assert_eq!(retry.status().as_u16(), 200);
    assert_eq!(json_body(retry).await["sent"], 1);
    assert_eq!(transport.sent().len(), 1);
}

// ============================================================================
// SECTION: Construction Tests
// ============================================================================

#[test]
fn missing_mail_credentials_fail_construction_closed() {
    let config = StillvoConfig {
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            trigger_secret: SECRET.to_string(),
        },
        store: StoreConfig {
            path: "/tmp/stillvo-test.db".into(),
        },
        mail: MailConfig {
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: String::new(),
            from: FROM.to_string(),
            request_timeout_ms: 2_000,
        },
    };
    let err = DigestServer::from_config(&config).expect_err("missing api key");
    assert!(matches!(err, DigestServerError::Config(_)));
    assert!(err.to_string().contains("api_key"));
}

// ============================================================================
// SECTION: Health Tests
// ============================================================================

#[tokio::test]
async fn health_probe_reports_ok() {
    let store = InMemoryDigestStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let base = start_server(&store, &transport).await;

    let response = reqwest::get(format!("{base}/api/health")).await.expect("request");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(json_body(response).await["ok"], true);
}
