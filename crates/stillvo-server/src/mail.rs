// crates/stillvo-server/src/mail.rs
// ============================================================================
// Module: HTTP Mail Client
// Description: Mail transport over a Resend-compatible HTTP API.
// Purpose: Deliver digest emails with bounded requests and explicit failures.
// Dependencies: stillvo-core, stillvo-config, reqwest
// ============================================================================

//! ## Overview
//! The mail client posts one JSON document per email to the configured API
//! endpoint with a bearer key. Any connection error or non-success status is
//! a transport failure; the dispatcher compensates by releasing the
//! recipient's reservation, so a rejected send never leaves a tombstone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use stillvo_config::MailConfig;
use stillvo_core::MailTransport;
use stillvo_core::OutboundEmail;
use stillvo_core::TransportError;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// JSON document accepted by the Resend-compatible send endpoint.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    /// Sender address.
    from: &'a str,
    /// Recipient address.
    to: &'a str,
    /// Subject line.
    subject: &'a str,
    /// Plain-text body.
    text: &'a str,
    /// Rich-text body.
    html: &'a str,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Mail transport over a Resend-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct HttpMailClient {
    /// Underlying HTTP client with the configured timeout.
    client: Client,
    /// Send endpoint URL.
    api_url: String,
    /// Bearer key for the mail API.
    api_key: String,
}

impl HttpMailClient {
    /// Builds a mail client from mail configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the HTTP client cannot be constructed.
    pub fn from_config(config: &MailConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| TransportError::SendFailed(err.to_string()))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailClient {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        let body = SendRequest {
            from: &email.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        };
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError::SendFailed(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::SendFailed(format!(
                "mail api returned status {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
