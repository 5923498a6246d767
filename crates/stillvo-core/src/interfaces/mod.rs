// crates/stillvo-core/src/interfaces/mod.rs
// ============================================================================
// Module: Stillvo Interfaces
// Description: Backend-agnostic interfaces for events, recipients, reservations, and mail.
// Purpose: Define the contract surfaces the digest dispatcher depends on.
// Dependencies: crate::core, async-trait
// ============================================================================

//! ## Overview
//! Interfaces define how the digest job integrates with the durable store and
//! the email transport without embedding backend-specific details. The
//! reservation ledger is the sole correctness mechanism for "at most one
//! digest per recipient per UTC day": `reserve` must be atomic at the storage
//! layer so that concurrent job invocations racing on the same key have
//! exactly one winner.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AcknowledgementEvent;
use crate::core::DayWindow;
use crate::core::DigestDate;
use crate::core::RecipientProfile;
use crate::core::UserId;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Durable store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("digest store io error: {0}")]
    Io(String),
    /// Store data is invalid.
    #[error("digest store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("digest store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Acknowledgement Store
// ============================================================================

/// Read contract over the append-only acknowledgement table.
pub trait AcknowledgementStore {
    /// Returns all acknowledgement events created inside the window, in
    /// arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn events_in_window(&self, window: &DayWindow)
    -> Result<Vec<AcknowledgementEvent>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Recipient Directory
// ============================================================================

/// Batched lookup from user identifiers to notification addresses.
pub trait RecipientDirectory {
    /// Resolves profiles for the given recipients in one batched lookup.
    ///
    /// Users without a profile row may be omitted from the result; users with
    /// a profile but no email are returned with `email: None`. Both count as
    /// unresolvable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn emails_for(&self, user_ids: &[UserId]) -> Result<Vec<RecipientProfile>, StoreError>;
}

// ============================================================================
// SECTION: Reservation Ledger
// ============================================================================

/// Outcome of a reservation attempt.
///
/// # Invariants
/// - Variants are stable and exhaustive for reservation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The slot was free and is now reserved by this caller.
    Reserved,
    /// A reservation already exists for this recipient and day.
    AlreadyReserved,
}

/// Per-recipient, per-day idempotency ledger.
///
/// Implementations must enforce uniqueness of `(receiver, digest_date)` with
/// a true storage-layer constraint, not an application-level check; multiple
/// invocations of the job may race on the same key.
pub trait ReservationLedger {
    /// Attempts to reserve the send slot for a recipient and day.
    ///
    /// Must be atomic: of any set of concurrent callers racing on the same
    /// key, exactly one observes [`ReserveOutcome::Reserved`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails for a reason other than a
    /// uniqueness conflict.
    fn reserve(&self, receiver: &UserId, date: &DigestDate)
    -> Result<ReserveOutcome, StoreError>;

    /// Releases a reservation, freeing the slot for a later invocation.
    ///
    /// Idempotent: releasing a non-existent reservation is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn release(&self, receiver: &UserId, date: &DigestDate) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Mail Transport
// ============================================================================

/// Transport errors for digest delivery.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport rejected or failed to deliver the message.
    #[error("mail transport error: {0}")]
    SendFailed(String),
}

/// Outbound email handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// Rich-text body.
    pub html: String,
}

/// Email transport responsible for delivering digest messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends one email.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when delivery fails.
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError>;
}
