// crates/stillvo-server/src/server.rs
// ============================================================================
// Module: Digest Server
// Description: HTTP trigger endpoint and health probe for the digest job.
// Purpose: Drive one dispatch cycle per authorized trigger invocation.
// Dependencies: stillvo-core, stillvo-config, stillvo-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! The server wires the durable store, the mail client, and the dispatcher
//! behind two routes: `/api/digest/send` (GET or POST, secret-protected) for
//! the external scheduler, and `/api/health` for probes. Construction fails
//! closed: missing configuration is rejected before the server ever binds,
//! so a trigger can never run without transport credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Deserialize;
use serde::Serialize;
use stillvo_config::StillvoConfig;
use stillvo_core::DigestCycleError;
use stillvo_core::DigestDispatcher;
use stillvo_core::SharedAcknowledgementStore;
use stillvo_core::Timestamp;
use stillvo_store_sqlite::SqliteDigestStore;
use thiserror::Error;

use crate::audit::DigestAuditEvent;
use crate::audit::DigestAuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::TriggerAuth;
use crate::auth::secret_fingerprint;
use crate::mail::HttpMailClient;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Digest server errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DigestServerError {
    /// Invalid or missing configuration.
    #[error("server config error: {0}")]
    Config(String),
    /// Component initialization failed.
    #[error("server init error: {0}")]
    Init(String),
    /// The HTTP server failed to bind or serve.
    #[error("server transport error: {0}")]
    Serve(String),
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state for the trigger and health handlers.
pub struct ServerState {
    /// Trigger secret authorizer.
    auth: TriggerAuth,
    /// Digest dispatcher driving one cycle per trigger.
    dispatcher: DigestDispatcher,
    /// Event store handle used for the health probe.
    events: SharedAcknowledgementStore,
    /// Audit sink for trigger and cycle events.
    audit: Arc<dyn DigestAuditSink>,
    /// Configured trigger secret, fingerprinted into allow audit events.
    secret_fingerprint: String,
}

impl ServerState {
    /// Builds server state from pre-wired collaborators.
    #[must_use]
    pub fn new(
        auth: TriggerAuth,
        dispatcher: DigestDispatcher,
        events: SharedAcknowledgementStore,
        audit: Arc<dyn DigestAuditSink>,
        trigger_secret: &str,
    ) -> Self {
        Self {
            auth,
            dispatcher,
            events,
            audit,
            secret_fingerprint: secret_fingerprint(trigger_secret),
        }
    }
}

/// Digest server instance.
pub struct DigestServer {
    /// Bind address for the HTTP listener.
    bind: String,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl std::fmt::Debug for DigestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestServer").field("bind", &self.bind).finish_non_exhaustive()
    }
}

impl DigestServer {
    /// Builds a digest server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DigestServerError`] when configuration is invalid or a
    /// component fails to initialize.
    pub fn from_config(config: &StillvoConfig) -> Result<Self, DigestServerError> {
        config.validate().map_err(|err| DigestServerError::Config(err.to_string()))?;
        let store = SqliteDigestStore::open(&config.store.path)
            .map_err(|err| DigestServerError::Init(err.to_string()))?;
        let transport = HttpMailClient::from_config(&config.mail)
            .map_err(|err| DigestServerError::Init(err.to_string()))?;
        let store = Arc::new(store);
        let dispatcher = DigestDispatcher::new(
            Arc::clone(&store) as SharedAcknowledgementStore,
            Arc::clone(&store) as _,
            Arc::clone(&store) as _,
            Arc::new(transport),
            config.mail.from.clone(),
        );
        let state = ServerState::new(
            TriggerAuth::new(config.server.trigger_secret.clone()),
            dispatcher,
            store,
            Arc::new(StderrAuditSink),
            &config.server.trigger_secret,
        );
        Ok(Self {
            bind: config.server.bind.clone(),
            state: Arc::new(state),
        })
    }

    /// Serves requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`DigestServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), DigestServerError> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| DigestServerError::Config("invalid bind address".to_string()))?;
        let app = build_router(self.state);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| DigestServerError::Serve("http bind failed".to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|_| DigestServerError::Serve("http server failed".to_string()))
    }
}

/// Builds the HTTP router over shared server state.
#[must_use]
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/digest/send", get(handle_trigger).post(handle_trigger))
        .route("/api/health", get(handle_health))
        .with_state(state)
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Query parameters accepted by the trigger endpoint.
#[derive(Debug, Deserialize)]
struct TriggerQuery {
    /// Trigger secret for schedulers that cannot set headers.
    token: Option<String>,
}

/// Successful trigger response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerResponse {
    /// Always true on success.
    ok: bool,
    /// Emails delivered this cycle.
    sent: usize,
    /// Recipients skipped because today's reservation already existed.
    skipped_already_sent: usize,
    /// Recipients skipped because no email address resolved.
    skipped_no_email: usize,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles the digest trigger: authorize, run one cycle, report counts.
async fn handle_trigger(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TriggerQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let auth_header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let credential = match state.auth.authorize(auth_header, query.token.as_deref()) {
        Ok(credential) => credential,
        Err(err) => {
            state.audit.record(&DigestAuditEvent::trigger_denied(err.to_string()));
            return (
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({ "error": "Unauthorized" })),
            );
        }
    };
    state.audit.record(&DigestAuditEvent::trigger_allowed(
        credential.label(),
        state.secret_fingerprint.clone(),
    ));

    let now = match wall_clock_now() {
        Ok(now) => now,
        Err(message) => {
            state.audit.record(&DigestAuditEvent::cycle_failed(message.clone()));
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, message);
        }
    };

    match state.dispatcher.run_cycle(now).await {
        Ok(report) if report.no_items => {
            state.audit.record(&DigestAuditEvent::cycle_completed(report));
            (
                StatusCode::OK,
                axum::Json(serde_json::json!({
                    "ok": true,
                    "sent": 0,
                    "note": "No digest items today",
                })),
            )
        }
        Ok(report) => {
            state.audit.record(&DigestAuditEvent::cycle_completed(report));
            let body = TriggerResponse {
                ok: true,
                sent: report.sent,
                skipped_already_sent: report.skipped_already_sent,
                skipped_no_email: report.skipped_no_email,
            };
            (
                StatusCode::OK,
                axum::Json(serde_json::to_value(&body).unwrap_or_default()),
            )
        }
        Err(err) => {
            state.audit.record(&DigestAuditEvent::cycle_failed(err.to_string()));
            let status = match err {
                DigestCycleError::Transport(_) => StatusCode::BAD_GATEWAY,
                DigestCycleError::Store(_) | DigestCycleError::Time(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            error_response(status, err.to_string())
        }
    }
}

/// Handles the health probe by asking the store for readiness.
async fn handle_health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.events.readiness() {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({ "ok": true })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({ "ok": false, "message": err.to_string() })),
        ),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a JSON error response with the given status.
fn error_response(
    status: StatusCode,
    message: String,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    (status, axum::Json(serde_json::json!({ "error": message })))
}

/// Reads the wall clock as a digest timestamp.
fn wall_clock_now() -> Result<Timestamp, String> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| "system clock before unix epoch".to_string())?;
    let millis = i64::try_from(elapsed.as_millis())
        .map_err(|_| "system clock out of range".to_string())?;
    Ok(Timestamp::from_unix_millis(millis))
}
