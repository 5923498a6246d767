// crates/stillvo-core/src/runtime/memory.rs
// ============================================================================
// Module: Stillvo In-Memory Store
// Description: Simple in-memory digest store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of the digest
//! store interfaces for tests and local demos. Reservation uniqueness is
//! enforced under a single mutex, so racing threads observe exactly one
//! [`ReserveOutcome::Reserved`]. It is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::AckKind;
use crate::core::AcknowledgementEvent;
use crate::core::DayWindow;
use crate::core::DigestDate;
use crate::core::RecipientProfile;
use crate::core::Timestamp;
use crate::core::UserId;
use crate::interfaces::AcknowledgementStore;
use crate::interfaces::RecipientDirectory;
use crate::interfaces::ReservationLedger;
use crate::interfaces::ReserveOutcome;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory digest store for tests and examples.
///
/// Implements every store interface the dispatcher depends on.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDigestStore {
    /// Acknowledgement events in insertion order.
    events: Arc<Mutex<Vec<AcknowledgementEvent>>>,
    /// Profiles keyed by user identifier.
    profiles: Arc<Mutex<BTreeMap<UserId, Option<String>>>>,
    /// Reservation keys `(receiver, digest_date)`.
    reservations: Arc<Mutex<BTreeSet<(UserId, DigestDate)>>>,
}

impl InMemoryDigestStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an acknowledgement event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn push_event(
        &self,
        receiver: &UserId,
        kind: AckKind,
        created_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::Store("event store mutex poisoned".to_string()))?
            .push(AcknowledgementEvent {
                receiver_id: receiver.clone(),
                kind,
                created_at,
            });
        Ok(())
    }

    /// Inserts or replaces a profile row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn set_profile(&self, user: &UserId, email: Option<&str>) -> Result<(), StoreError> {
        self.profiles
            .lock()
            .map_err(|_| StoreError::Store("profile store mutex poisoned".to_string()))?
            .insert(user.clone(), email.map(str::to_string));
        Ok(())
    }

    /// Returns the number of reservations currently held.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn reservation_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .reservations
            .lock()
            .map_err(|_| StoreError::Store("reservation mutex poisoned".to_string()))?
            .len())
    }
}

impl AcknowledgementStore for InMemoryDigestStore {
    fn events_in_window(
        &self,
        window: &DayWindow,
    ) -> Result<Vec<AcknowledgementEvent>, StoreError> {
        let guard = self
            .events
            .lock()
            .map_err(|_| StoreError::Store("event store mutex poisoned".to_string()))?;
        Ok(guard.iter().filter(|event| window.contains(event.created_at)).cloned().collect())
    }
}

impl RecipientDirectory for InMemoryDigestStore {
    fn emails_for(&self, user_ids: &[UserId]) -> Result<Vec<RecipientProfile>, StoreError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|_| StoreError::Store("profile store mutex poisoned".to_string()))?;
        Ok(user_ids
            .iter()
            .filter_map(|user_id| {
                guard.get(user_id).map(|email| RecipientProfile {
                    user_id: user_id.clone(),
                    email: email.clone(),
                })
            })
            .collect())
    }
}

impl ReservationLedger for InMemoryDigestStore {
    fn reserve(
        &self,
        receiver: &UserId,
        date: &DigestDate,
    ) -> Result<ReserveOutcome, StoreError> {
        let mut guard = self
            .reservations
            .lock()
            .map_err(|_| StoreError::Store("reservation mutex poisoned".to_string()))?;
        if guard.insert((receiver.clone(), date.clone())) {
            Ok(ReserveOutcome::Reserved)
        } else {
            Ok(ReserveOutcome::AlreadyReserved)
        }
    }

    fn release(&self, receiver: &UserId, date: &DigestDate) -> Result<(), StoreError> {
        self.reservations
            .lock()
            .map_err(|_| StoreError::Store("reservation mutex poisoned".to_string()))?
            .remove(&(receiver.clone(), date.clone()));
        Ok(())
    }
}
