// crates/stillvo-core/src/core/mod.rs
// ============================================================================
// Module: Stillvo Core Types
// Description: Canonical Stillvo domain structures.
// Purpose: Provide stable, serializable types for acknowledgements and digests.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Stillvo core types define acknowledgement events, recipient profiles,
//! digest dates, and the composed digest message. These types are the
//! canonical source of truth for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod acknowledgement;
pub mod digest;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use acknowledgement::AckKind;
pub use acknowledgement::AcknowledgementEvent;
pub use acknowledgement::RecipientProfile;
pub use digest::DigestMessage;
pub use digest::compose_digest;
pub use identifiers::PostId;
pub use identifiers::UserId;
pub use time::DayWindow;
pub use time::DigestDate;
pub use time::TimeError;
pub use time::Timestamp;
