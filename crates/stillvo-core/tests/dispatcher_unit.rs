// crates/stillvo-core/tests/dispatcher_unit.rs
// ============================================================================
// Module: Digest Dispatcher Unit Tests
// Description: Cycle-level tests for the digest dispatcher.
// Purpose: Validate idempotence, short-circuits, compensation, and races.
// ============================================================================

//! ## Overview
//! Cycle-level tests over the in-memory store and a recording transport:
//! - Idempotence across back-to-back cycles on the same UTC day
//! - No-items short-circuit with zero side effects
//! - No-email skip without reservation or transport attempts
//! - Compensation on transport failure enabling a same-day retry
//! - Concurrent cycles racing on the same recipient send exactly once
//! - Fail-fast abort does not roll back earlier sends

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use stillvo_core::AckKind;
use stillvo_core::DigestCycleError;
use stillvo_core::DigestDispatcher;
use stillvo_core::InMemoryDigestStore;
use stillvo_core::MailTransport;
use stillvo_core::OutboundEmail;
use stillvo_core::Timestamp;
use stillvo_core::TransportError;
use stillvo_core::UserId;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// 2024-06-15T12:00:00Z in unix millis.
const NOON: i64 = 1_718_452_800_000;
/// Sender address used by the tests.
const FROM: &str = "digest@stillvo.test";

/// Transport that records sent emails and fails the first `fail_first` calls.
#[derive(Default)]
struct RecordingTransport {
    /// Emails accepted by the transport.
    sent: Mutex<Vec<OutboundEmail>>,
    /// Number of leading calls to reject.
    fail_first: AtomicUsize,
    /// Total calls observed, including failures.
    calls: AtomicUsize,
}

impl RecordingTransport {
    fn failing_first(count: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("transport mutex").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        self.sent.lock().expect("transport mutex").push(email.clone());
        Ok(())
    }
}

fn dispatcher(
    store: &InMemoryDigestStore,
    transport: &Arc<RecordingTransport>,
) -> DigestDispatcher {
    DigestDispatcher::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(transport) as Arc<dyn MailTransport>,
        FROM,
    )
}

fn seeded_store(receivers: &[(&str, Option<&str>, &[AckKind])]) -> InMemoryDigestStore {
    let store = InMemoryDigestStore::new();
    for (name, email, kinds) in receivers {
        let user = UserId::new(*name);
        store.set_profile(&user, *email).expect("seed profile");
        for (offset, kind) in kinds.iter().enumerate() {
            let at = Timestamp::from_unix_millis(NOON + i64::try_from(offset).expect("offset"));
            store.push_event(&user, *kind, at).expect("seed event");
        }
    }
    store
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn sends_once_per_recipient_per_day() {
    let store = seeded_store(&[(
        "ada",
        Some("ada@example.com"),
        &[AckKind::Read, AckKind::Resonated],
    )]);
    let transport = Arc::new(RecordingTransport::default());
    let job = dispatcher(&store, &transport);

    let first = job.run_cycle(Timestamp::from_unix_millis(NOON)).await.expect("first cycle");
    assert_eq!(first.sent, 1);
    assert_eq!(first.skipped_already_sent, 0);
    assert!(!first.no_items);

    let second = job.run_cycle(Timestamp::from_unix_millis(NOON)).await.expect("second cycle");
    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped_already_sent, 1);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, FROM);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "Your Stillvo digest");
}

#[tokio::test]
async fn no_items_short_circuits_without_side_effects() {
    let store = InMemoryDigestStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let job = dispatcher(&store, &transport);

    let report = job.run_cycle(Timestamp::from_unix_millis(NOON)).await.expect("cycle");
    assert_eq!(report.sent, 0);
    assert!(report.no_items);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.reservation_count().expect("count"), 0);
}

#[tokio::test]
async fn recipient_without_email_is_skipped_without_reservation() {
    let store = seeded_store(&[
        ("ada", Some("ada@example.com"), &[AckKind::Read]),
        ("quiet", None, &[AckKind::ThankYou]),
    ]);
    let transport = Arc::new(RecordingTransport::default());
    let job = dispatcher(&store, &transport);

    let report = job.run_cycle(Timestamp::from_unix_millis(NOON)).await.expect("cycle");
    assert_eq!(report.sent, 1);
    assert_eq!(report.skipped_no_email, 1);
    assert_eq!(store.reservation_count().expect("count"), 1);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn events_outside_the_day_window_are_ignored() {
    let store = seeded_store(&[("ada", Some("ada@example.com"), &[AckKind::Read])]);
    let user = UserId::new("ada");
    // Yesterday and tomorrow relative to the noon trigger.
    store
        .push_event(&user, AckKind::Resonated, Timestamp::from_unix_millis(NOON - 86_400_000))
        .expect("seed");
    store
        .push_event(&user, AckKind::ThankYou, Timestamp::from_unix_millis(NOON + 86_400_000))
        .expect("seed");
    let transport = Arc::new(RecordingTransport::default());
    let job = dispatcher(&store, &transport);

    let report = job.run_cycle(Timestamp::from_unix_millis(NOON)).await.expect("cycle");
    assert_eq!(report.sent, 1);
    let sent = transport.sent();
    assert!(sent[0].text.contains("Someone read your writing."));
    assert!(!sent[0].text.contains("resonated"));
    assert!(!sent[0].text.contains("appreciated"));
}

#[tokio::test]
async fn transport_failure_releases_reservation_and_allows_retry() {
    let store = seeded_store(&[("ada", Some("ada@example.com"), &[AckKind::Read])]);
    let transport = Arc::new(RecordingTransport::failing_first(1));
    let job = dispatcher(&store, &transport);

    let err = job
        .run_cycle(Timestamp::from_unix_millis(NOON))
        .await
        .expect_err("transport failure aborts the cycle");
    assert!(matches!(err, DigestCycleError::Transport(_)));
    assert_eq!(store.reservation_count().expect("count"), 0);

    // A later invocation within the same day reserves and sends.
    let retry = job.run_cycle(Timestamp::from_unix_millis(NOON)).await.expect("retry cycle");
    assert_eq!(retry.sent, 1);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn transport_failure_does_not_roll_back_earlier_sends() {
    let store = seeded_store(&[
        ("ada", Some("ada@example.com"), &[AckKind::Read]),
        ("ben", Some("ben@example.com"), &[AckKind::Resonated]),
    ]);
    let recorder = Arc::new(RecordingTransport::default());
    // Permit exactly one send, then fail every subsequent call.
    let flaky = Arc::new(FailAfter {
        inner: Arc::clone(&recorder),
        allow: AtomicUsize::new(1),
    });
    let job = DigestDispatcher::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        flaky as Arc<dyn MailTransport>,
        FROM,
    );

    let err = job
        .run_cycle(Timestamp::from_unix_millis(NOON))
        .await
        .expect_err("second send fails");
    assert!(matches!(err, DigestCycleError::Transport(_)));
    // One reservation survives for the delivered recipient; the failed one
    // was released.
    assert_eq!(store.reservation_count().expect("count"), 1);
    assert_eq!(recorder.sent().len(), 1);
}

/// Transport decorator that permits `allow` sends then fails every call.
struct FailAfter {
    /// Delegate transport for permitted sends.
    inner: Arc<RecordingTransport>,
    /// Remaining permitted sends.
    allow: AtomicUsize,
}

#[async_trait]
impl MailTransport for FailAfter {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        let remaining = self.allow.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        self.allow.store(remaining - 1, Ordering::SeqCst);
        self.inner.send(email).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cycles_send_exactly_once() {
    let store = seeded_store(&[("ada", Some("ada@example.com"), &[AckKind::Read])]);
    let transport = Arc::new(RecordingTransport::default());
    let job_a = dispatcher(&store, &transport);
    let job_b = dispatcher(&store, &transport);

    let now = Timestamp::from_unix_millis(NOON);
    let (left, right) = tokio::join!(job_a.run_cycle(now), job_b.run_cycle(now));
    let left = left.expect("cycle a");
    let right = right.expect("cycle b");

    assert_eq!(left.sent + right.sent, 1);
    assert_eq!(left.skipped_already_sent + right.skipped_already_sent, 1);
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(store.reservation_count().expect("count"), 1);
}
