// crates/stillvo-core/src/runtime/mod.rs
// ============================================================================
// Module: Stillvo Runtime
// Description: Digest dispatch cycle and in-memory store implementations.
// Purpose: Drive one batch cycle of the daily digest over the interface seams.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime contains the only component with side effects and ordering
//! requirements: the digest dispatcher. The in-memory store exists for tests
//! and local demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dispatcher;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatcher::DigestCycleError;
pub use dispatcher::DigestCycleReport;
pub use dispatcher::DigestDispatcher;
pub use dispatcher::SharedAcknowledgementStore;
pub use dispatcher::SharedMailTransport;
pub use dispatcher::SharedRecipientDirectory;
pub use dispatcher::SharedReservationLedger;
pub use memory::InMemoryDigestStore;
