// crates/stillvo-core/src/lib.rs
// ============================================================================
// Module: Stillvo Core Library
// Description: Public API surface for the Stillvo digest core.
// Purpose: Expose domain types, interfaces, and the dispatch runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Stillvo core implements the daily acknowledgement digest: grouping the
//! day's acknowledgement events per recipient, reserving a one-time send slot
//! per recipient per UTC day, composing a quiet digest message, and driving
//! an email transport with compensation on failure. It is backend-agnostic
//! and integrates through explicit interfaces rather than embedding a
//! specific database or mail provider.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AcknowledgementStore;
pub use interfaces::MailTransport;
pub use interfaces::OutboundEmail;
pub use interfaces::RecipientDirectory;
pub use interfaces::ReservationLedger;
pub use interfaces::ReserveOutcome;
pub use interfaces::StoreError;
pub use interfaces::TransportError;
pub use runtime::DigestCycleError;
pub use runtime::DigestCycleReport;
pub use runtime::DigestDispatcher;
pub use runtime::InMemoryDigestStore;
pub use runtime::SharedAcknowledgementStore;
pub use runtime::SharedMailTransport;
pub use runtime::SharedRecipientDirectory;
pub use runtime::SharedReservationLedger;
