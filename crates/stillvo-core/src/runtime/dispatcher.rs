// crates/stillvo-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Stillvo Digest Dispatcher
// Description: One batch cycle of the daily acknowledgement digest.
// Purpose: Reserve, compose, and send at most one digest per recipient per UTC day.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The dispatcher executes one cycle: fetch the day's acknowledgement events,
//! group them by recipient in arrival order, resolve emails in one batched
//! lookup, reserve a send slot per recipient, compose, and send. Correctness
//! under concurrent invocations rests entirely on the atomicity of the
//! reservation ledger; the dispatcher performs no in-process locking.
//!
//! A transport failure releases the just-created reservation and aborts the
//! remainder of the cycle. Recipients already sent earlier in the same cycle
//! are not rolled back. This fail-fast policy is deliberate: a transport
//! outage stops the batch rather than silently skipping recipients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::AckKind;
use crate::core::DayWindow;
use crate::core::DigestDate;
use crate::core::TimeError;
use crate::core::Timestamp;
use crate::core::UserId;
use crate::core::compose_digest;
use crate::interfaces::AcknowledgementStore;
use crate::interfaces::MailTransport;
use crate::interfaces::OutboundEmail;
use crate::interfaces::RecipientDirectory;
use crate::interfaces::ReservationLedger;
use crate::interfaces::ReserveOutcome;
use crate::interfaces::StoreError;
use crate::interfaces::TransportError;

// ============================================================================
// SECTION: Cycle Report
// ============================================================================

/// Aggregate counts for one digest cycle.
///
/// # Invariants
/// - `no_items` is true only when the day window held zero events, in which
///   case every counter is zero and no side effects occurred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DigestCycleReport {
    /// Emails delivered this cycle.
    pub sent: usize,
    /// Recipients skipped because today's reservation already existed.
    pub skipped_already_sent: usize,
    /// Recipients skipped because no email address resolved.
    pub skipped_no_email: usize,
    /// True when the day window held no events at all.
    pub no_items: bool,
}

impl DigestCycleReport {
    /// Report for a day with no digest items.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            sent: 0,
            skipped_already_sent: 0,
            skipped_no_email: 0,
            no_items: true,
        }
    }
}

// ============================================================================
// SECTION: Cycle Errors
// ============================================================================

/// Digest cycle errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling. A reservation conflict is
///   never an error; it is absorbed into the report counters.
#[derive(Debug, Error)]
pub enum DigestCycleError {
    /// The trigger timestamp could not be mapped to a UTC calendar day.
    #[error("digest cycle time error: {0}")]
    Time(#[from] TimeError),
    /// Event, profile, or ledger access failed; nothing partial is committed.
    #[error("digest cycle store error: {0}")]
    Store(#[from] StoreError),
    /// Transport delivery failed after its reservation was released.
    #[error("digest cycle transport error: {0}")]
    Transport(#[from] TransportError),
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Shared handle to an acknowledgement store implementation.
pub type SharedAcknowledgementStore = Arc<dyn AcknowledgementStore + Send + Sync>;
/// Shared handle to a recipient directory implementation.
pub type SharedRecipientDirectory = Arc<dyn RecipientDirectory + Send + Sync>;
/// Shared handle to a reservation ledger implementation.
pub type SharedReservationLedger = Arc<dyn ReservationLedger + Send + Sync>;
/// Shared handle to a mail transport implementation.
pub type SharedMailTransport = Arc<dyn MailTransport>;

/// Digest dispatcher orchestrating one batch cycle.
pub struct DigestDispatcher {
    /// Acknowledgement event source.
    events: SharedAcknowledgementStore,
    /// Recipient email resolution.
    recipients: SharedRecipientDirectory,
    /// Per-recipient, per-day idempotency ledger.
    ledger: SharedReservationLedger,
    /// Email transport.
    transport: SharedMailTransport,
    /// Sender address used for every digest email.
    from: String,
}

impl DigestDispatcher {
    /// Builds a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(
        events: SharedAcknowledgementStore,
        recipients: SharedRecipientDirectory,
        ledger: SharedReservationLedger,
        transport: SharedMailTransport,
        from: impl Into<String>,
    ) -> Self {
        Self {
            events,
            recipients,
            ledger,
            transport,
            from: from.into(),
        }
    }

    /// Executes one digest cycle for the UTC day containing `now`.
    ///
    /// Side effects: reservation rows are written (and removed on transport
    /// failure); emails are sent exactly once per successful reservation. No
    /// event or profile data is mutated.
    ///
    /// # Errors
    ///
    /// Returns [`DigestCycleError`] on store read failure or transport
    /// failure; reservation conflicts and unresolvable emails are absorbed
    /// into the report counters.
    pub async fn run_cycle(&self, now: Timestamp) -> Result<DigestCycleReport, DigestCycleError> {
        let window = DayWindow::containing(now)?;
        let date = DigestDate::from_timestamp(now)?;

        let events = self.events.events_in_window(&window)?;
        if events.is_empty() {
            return Ok(DigestCycleReport::empty());
        }

        // Group by recipient, preserving each recipient's arrival order. No
        // ordering guarantee is required across recipients.
        let mut order: Vec<UserId> = Vec::new();
        let mut grouped: HashMap<UserId, Vec<AckKind>> = HashMap::new();
        for event in events {
            if !grouped.contains_key(&event.receiver_id) {
                order.push(event.receiver_id.clone());
            }
            grouped.entry(event.receiver_id).or_default().push(event.kind);
        }

        let profiles = self.recipients.emails_for(&order)?;
        let mut email_by_user: HashMap<UserId, String> = HashMap::new();
        for profile in profiles {
            if let Some(email) = profile.email {
                email_by_user.insert(profile.user_id, email);
            }
        }

        let mut report = DigestCycleReport::default();
        for receiver in order {
            let Some(to) = email_by_user.get(&receiver) else {
                report.skipped_no_email += 1;
                continue;
            };
            match self.ledger.reserve(&receiver, &date)? {
                ReserveOutcome::AlreadyReserved => {
                    report.skipped_already_sent += 1;
                    continue;
                }
                ReserveOutcome::Reserved => {}
            }

            let kinds = grouped.get(&receiver).map_or(&[] as &[AckKind], Vec::as_slice);
            let message = compose_digest(kinds);
            let email = OutboundEmail {
                from: self.from.clone(),
                to: to.clone(),
                subject: message.subject,
                text: message.text_body,
                html: message.html_body,
            };

            if let Err(err) = self.transport.send(&email).await {
                // Free the slot so a later invocation within the same day can
                // retry this recipient, then abort the whole cycle. A failed
                // release surfaces as the store error instead; a reservation
                // left in place without a successful send must never pass
                // silently.
                self.ledger.release(&receiver, &date)?;
                return Err(DigestCycleError::Transport(err));
            }
            report.sent += 1;
        }

        Ok(report)
    }
}
