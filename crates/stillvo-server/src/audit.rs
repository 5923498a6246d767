// crates/stillvo-server/src/audit.rs
// ============================================================================
// Module: Digest Audit Logging
// Description: Structured audit events for trigger handling and cycles.
// Purpose: Emit redacted audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for digest trigger
//! logging. It is intentionally lightweight so deployments can route events
//! to their preferred logging pipeline without redesign. Events never carry
//! secrets or recipient addresses; credentials appear only as hashed
//! fingerprints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use stillvo_core::DigestCycleReport;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Digest audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct DigestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Decision or outcome label.
    pub outcome: &'static str,
    /// Credential label for authorized triggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<&'static str>,
    /// Hashed fingerprint of the presented secret, when one was presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_fingerprint: Option<String>,
    /// Cycle counters for completed cycles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DigestCycleReport>,
    /// Failure reason for denied or failed events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DigestAuditEvent {
    /// Builds an event skeleton with the current wall-clock timestamp.
    fn base(event: &'static str, outcome: &'static str) -> Self {
        Self {
            event,
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default(),
            outcome,
            credential: None,
            credential_fingerprint: None,
            report: None,
            reason: None,
        }
    }

    /// Builds an authorized-trigger event.
    #[must_use]
    pub fn trigger_allowed(credential: &'static str, fingerprint: String) -> Self {
        let mut event = Self::base("digest_trigger", "allow");
        event.credential = Some(credential);
        event.credential_fingerprint = Some(fingerprint);
        event
    }

    /// Builds a denied-trigger event.
    #[must_use]
    pub fn trigger_denied(reason: String) -> Self {
        let mut event = Self::base("digest_trigger", "deny");
        event.reason = Some(reason);
        event
    }

    /// Builds a completed-cycle event.
    #[must_use]
    pub fn cycle_completed(report: DigestCycleReport) -> Self {
        let mut event = Self::base("digest_cycle", "completed");
        event.report = Some(report);
        event
    }

    /// Builds a failed-cycle event.
    #[must_use]
    pub fn cycle_failed(reason: String) -> Self {
        let mut event = Self::base("digest_cycle", "failed");
        event.reason = Some(reason);
        event
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for digest events.
pub trait DigestAuditSink: Send + Sync {
    /// Records one audit event.
    fn record(&self, event: &DigestAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl DigestAuditSink for StderrAuditSink {
    fn record(&self, event: &DigestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl DigestAuditSink for NoopAuditSink {
    fn record(&self, _event: &DigestAuditEvent) {}
}
