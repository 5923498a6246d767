// crates/stillvo-store-sqlite/src/lib.rs
// ============================================================================
// Module: Stillvo SQLite Store Library
// Description: Public API surface for the SQLite digest store.
// Purpose: Expose the durable store implementation and its configuration.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! Durable implementation of the Stillvo store interfaces backed by `SQLite`.
//! The send-reservation table's primary key is the uniqueness constraint that
//! guarantees "at most one digest email per recipient per UTC day" under
//! concurrent job invocations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::AckOutcome;
pub use store::SqliteDigestStore;
pub use store::SqliteStoreError;
