// crates/stillvo-core/src/core/acknowledgement.rs
// ============================================================================
// Module: Stillvo Acknowledgements
// Description: Acknowledgement kinds, events, and recipient profiles.
// Purpose: Model the private, non-quantitative signals the digest summarizes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An acknowledgement is a private signal (read / resonated / thank-you) one
//! user records about another user's post. The posting subsystem enforces at
//! most one event per (sender, post, kind); the digest job only ever reads
//! events already deduplicated at the source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Acknowledgement Kinds
// ============================================================================

/// Closed enumeration of acknowledgement kinds.
///
/// # Invariants
/// - Wire forms are `read`, `resonated`, and `thank_you`; no other values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckKind {
    /// Someone read the recipient's writing.
    Read,
    /// Something the recipient wrote resonated with someone.
    Resonated,
    /// Someone appreciated that the recipient shared.
    ThankYou,
}

impl AckKind {
    /// Parses a wire-form kind label, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(Self::Read),
            "resonated" => Some(Self::Resonated),
            "thank_you" => Some(Self::ThankYou),
            _ => None,
        }
    }

    /// Returns the stable wire-form label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Resonated => "resonated",
            Self::ThankYou => "thank_you",
        }
    }
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Events and Profiles
// ============================================================================

/// Acknowledgement event as read from the acknowledgement store.
///
/// # Invariants
/// - Never mutated or deleted by the digest job; consumed read-only.
/// - Carries the post owner (`receiver_id`), never the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgementEvent {
    /// Owner of the acknowledged post.
    pub receiver_id: UserId,
    /// Acknowledgement kind.
    pub kind: AckKind,
    /// Event creation time, UTC.
    pub created_at: Timestamp,
}

/// Recipient profile row from the profile subsystem.
///
/// # Invariants
/// - `email` is `None` when the user has no resolvable notification address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientProfile {
    /// User identifier.
    pub user_id: UserId,
    /// Notification email address, when present.
    pub email: Option<String>,
}
