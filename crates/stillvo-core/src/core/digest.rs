// crates/stillvo-core/src/core/digest.rs
// ============================================================================
// Module: Stillvo Digest Composer
// Description: Pure composition of the daily digest message.
// Purpose: Map one recipient's acknowledgement kinds to a subject/text/html triple.
// Dependencies: crate::core::acknowledgement
// ============================================================================

//! ## Overview
//! The composer is pure and stateless. It receives one recipient's
//! acknowledgement kinds in arrival order and produces a message with at most
//! one line per kind, a cap of ten lines, and a single overflow line when more
//! than ten events arrived. The output carries no counts and no sender
//! identities; the composer never receives either.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::acknowledgement::AckKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum deduplicated lines per digest.
const MAX_LINES: usize = 10;
/// Subject line for every digest email.
const SUBJECT: &str = "Your Stillvo digest";
/// Opening line shared by both renderings.
const HEADER: &str = "A quiet note from Stillvo.";
/// Closing disclaimer shared by both renderings.
const FOOTER: &str = "No counts. No names. No pressure.";
/// Signature line shared by both renderings.
const SIGNATURE: &str = "\u{2014} Stillvo";
/// Line appended when more than [`MAX_LINES`] events arrived.
const OVERFLOW_LINE: &str = "A few more acknowledgements arrived quietly.";

// ============================================================================
// SECTION: Digest Message
// ============================================================================

/// Composed digest message, ephemeral and never persisted.
///
/// # Invariants
/// - `text_body` and `html_body` render the same lines in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestMessage {
    /// Email subject line.
    pub subject: String,
    /// Plain-text rendering.
    pub text_body: String,
    /// Rich-text rendering of the same content.
    pub html_body: String,
}

/// Maps an acknowledgement kind to its fixed, non-quantitative sentence.
const fn kind_line(kind: AckKind) -> &'static str {
    match kind {
        AckKind::Read => "Someone read your writing.",
        AckKind::Resonated => "Something you wrote resonated with someone.",
        AckKind::ThankYou => "Someone appreciated that you shared.",
    }
}

/// Composes the digest message for one recipient.
///
/// Input is the recipient's acknowledgement kinds in arrival order. Each kind
/// contributes at most one line (first-occurrence order); when the original
/// event count exceeds ten, a single overflow line is appended.
#[must_use]
pub fn compose_digest(kinds: &[AckKind]) -> DigestMessage {
    let mut seen: Vec<AckKind> = Vec::new();
    for kind in kinds {
        if !seen.contains(kind) {
            seen.push(*kind);
        }
    }
    seen.truncate(MAX_LINES);

    let mut lines: Vec<String> =
        seen.iter().map(|kind| format!("\u{2022} {}", kind_line(*kind))).collect();
    if kinds.len() > MAX_LINES {
        lines.push(format!("\u{2022} {OVERFLOW_LINE}"));
    }

    DigestMessage {
        subject: SUBJECT.to_string(),
        text_body: render_text(&lines),
        html_body: render_html(&lines),
    }
}

// ============================================================================
// SECTION: Renderers
// ============================================================================

/// Renders the plain-text body.
fn render_text(lines: &[String]) -> String {
    format!("{HEADER}\n\n{}\n\n{FOOTER}\n\n{SIGNATURE}", lines.join("\n"))
}

/// Renders the rich-text body with the same lines in the same order.
fn render_html(lines: &[String]) -> String {
    let items: String = lines
        .iter()
        .map(|line| format!("<div style=\"margin:6px 0; color:#222;\">{line}</div>"))
        .collect();
    format!(
        concat!(
            "<div style=\"font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial; ",
            "line-height:1.5; color:#111;\">",
            "<h2 style=\"margin:0 0 12px 0;\">{subject}</h2>",
            "<p style=\"margin:0 0 16px 0; color:#444;\">{header}</p>",
            "<div style=\"padding:14px; border:1px solid #eee; border-radius:14px;\">{items}</div>",
            "<p style=\"margin:16px 0 0 0; color:#666; font-size: 13px;\">{footer}</p>",
            "<p style=\"margin:10px 0 0 0; color:#666; font-size: 13px;\">{signature}</p>",
            "</div>"
        ),
        subject = SUBJECT,
        header = HEADER,
        items = items,
        footer = FOOTER,
        signature = SIGNATURE,
    )
}
