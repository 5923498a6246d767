// crates/stillvo-core/src/core/time.rs
// ============================================================================
// Module: Stillvo Time Model
// Description: UTC timestamps, calendar-day windows, and digest dates.
// Purpose: Pin the "once per day" boundary to the UTC calendar day.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! The digest job computes everything against the UTC calendar day: the event
//! read window is `[start_of_day, start_of_day + 24h)` and the reservation key
//! uses a `YYYY-MM-DD` date string. Callers supply the current time
//! explicitly; the core never reads the wall clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Milliseconds in one UTC day.
const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in acknowledgement records and trigger times.
///
/// # Invariants
/// - Values are unix epoch milliseconds, always UTC.
/// - No validation is performed at construction; range checks happen when a
///   calendar day is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}

/// Time conversion errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Timestamp falls outside the representable calendar range.
    #[error("timestamp out of calendar range: {0} ms")]
    OutOfRange(i64),
}

/// Half-open UTC day window `[start, end)` in unix epoch milliseconds.
///
/// # Invariants
/// - `end - start` is exactly 24 hours.
/// - `start` is midnight UTC of the day containing the source timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    /// Inclusive window start (midnight UTC), unix millis.
    pub start: i64,
    /// Exclusive window end (next midnight UTC), unix millis.
    pub end: i64,
}

impl DayWindow {
    /// Computes the UTC day window containing `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when `now` is outside the representable range.
    pub fn containing(now: Timestamp) -> Result<Self, TimeError> {
        let start = utc_midnight_millis(now)?;
        Ok(Self {
            start,
            end: start + DAY_MILLIS,
        })
    }

    /// Returns true when `at` falls inside the window.
    #[must_use]
    pub const fn contains(&self, at: Timestamp) -> bool {
        at.as_unix_millis() >= self.start && at.as_unix_millis() < self.end
    }
}

/// UTC calendar date used as the per-day reservation key.
///
/// # Invariants
/// - Wire form is always `YYYY-MM-DD`, derived in UTC regardless of locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestDate(String);

impl DigestDate {
    /// Derives the UTC calendar date containing `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when `now` is outside the representable range.
    pub fn from_timestamp(now: Timestamp) -> Result<Self, TimeError> {
        let date = utc_date(now)?;
        Ok(Self(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        )))
    }

    /// Returns the date as a `YYYY-MM-DD` string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DigestDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the UTC calendar date for a timestamp.
fn utc_date(now: Timestamp) -> Result<time::Date, TimeError> {
    let seconds = now.as_unix_millis().div_euclid(1000);
    OffsetDateTime::from_unix_timestamp(seconds)
        .map(OffsetDateTime::date)
        .map_err(|_| TimeError::OutOfRange(now.as_unix_millis()))
}

/// Returns midnight UTC of the day containing `now`, in unix millis.
fn utc_midnight_millis(now: Timestamp) -> Result<i64, TimeError> {
    let date = utc_date(now)?;
    let midnight = date.midnight().assume_utc();
    Ok(midnight.unix_timestamp() * 1000)
}
