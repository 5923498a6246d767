// crates/stillvo-server/src/lib.rs
// ============================================================================
// Module: Stillvo Server Library
// Description: HTTP trigger surface for the Stillvo digest service.
// Purpose: Expose the digest trigger, health probe, mail client, and audit sinks.
// Dependencies: stillvo-core, stillvo-config, stillvo-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! The server exposes the digest trigger endpoint for the external scheduler
//! and a health probe. The trigger requires a shared secret (bearer header or
//! query token) and drives one dispatch cycle per invocation. All request
//! outcomes are emitted as JSON-line audit events.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod mail;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::DigestAuditEvent;
pub use audit::DigestAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthError;
pub use auth::TriggerAuth;
pub use auth::TriggerCredential;
pub use mail::HttpMailClient;
pub use server::DigestServer;
pub use server::DigestServerError;
pub use server::ServerState;
pub use server::build_router;
