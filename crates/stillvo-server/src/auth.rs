// crates/stillvo-server/src/auth.rs
// ============================================================================
// Module: Trigger Authentication
// Description: Shared-secret enforcement for the digest trigger endpoint.
// Purpose: Reject unauthorized trigger calls before any side effects.
// Dependencies: sha2, subtle
// ============================================================================

//! ## Overview
//! The trigger endpoint accepts the configured secret either as an
//! `Authorization: Bearer` header or as a `token` query parameter (the latter
//! exists for schedulers that cannot set headers). Comparison is constant
//! time; a denied request causes no side effects. Audit events carry a hashed
//! fingerprint of the presented secret, never the secret itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How the caller presented the trigger secret.
///
/// # Invariants
/// - Variants are stable and exhaustive for authorized trigger calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCredential {
    /// Secret supplied as `Authorization: Bearer <secret>`.
    BearerHeader,
    /// Secret supplied as the `token` query parameter.
    QueryToken,
}

impl TriggerCredential {
    /// Returns the stable audit label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BearerHeader => "bearer_header",
            Self::QueryToken => "query_token",
        }
    }
}

/// Trigger authorization errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("missing trigger credential")]
    Missing,
    /// A credential was presented but did not match.
    #[error("invalid trigger credential")]
    Mismatch,
}

// ============================================================================
// SECTION: Trigger Auth
// ============================================================================

/// Shared-secret authorizer for the trigger endpoint.
#[derive(Debug, Clone)]
pub struct TriggerAuth {
    /// Configured trigger secret.
    secret: String,
}

impl TriggerAuth {
    /// Builds an authorizer around the configured secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Authorizes a trigger call from the header and query credentials.
    ///
    /// The bearer header is checked first; the query token is a fallback.
    /// Both comparisons are constant time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no credential is presented or none matches.
    pub fn authorize(
        &self,
        auth_header: Option<&str>,
        query_token: Option<&str>,
    ) -> Result<TriggerCredential, AuthError> {
        let bearer = auth_header.and_then(parse_bearer);
        if bearer.is_none() && query_token.is_none() {
            return Err(AuthError::Missing);
        }
        if let Some(candidate) = bearer
            && self.matches(candidate)
        {
            return Ok(TriggerCredential::BearerHeader);
        }
        if let Some(candidate) = query_token
            && self.matches(candidate)
        {
            return Ok(TriggerCredential::QueryToken);
        }
        Err(AuthError::Mismatch)
    }

    /// Constant-time comparison against the configured secret.
    fn matches(&self, candidate: &str) -> bool {
        self.secret.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the token from a `Bearer <token>` header value.
fn parse_bearer(header: &str) -> Option<&str> {
    let rest = header.strip_prefix("Bearer ")?;
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Returns the sha256 fingerprint of a presented secret for audit logs.
#[must_use]
pub fn secret_fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
