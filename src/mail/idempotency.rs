//! Idempotency ledger for contact submissions.
//!
//! A client may send an `Idempotency-Key` with a submission. Once a submission
//! with a key has been delivered, later submissions with the same key inside
//! the window are answered from the ledger instead of being sent again. Failed
//! or abandoned submissions release their key so the client can retry.
//!
//! Each key is bound to the fingerprint of the submission that first used it.
//! Reusing a key for a different submission is reported as a mismatch.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Longest time a key may stay in flight before it is considered abandoned.
pub const DEFAULT_IN_FLIGHT_TIMEOUT: Duration = Duration::from_secs(300);

/// State of a key in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    /// A submission with this key is being delivered.
    InFlight { fingerprint: String, since: Instant },
    /// A submission with this key was delivered.
    Delivered {
        fingerprint: String,
        submission_id: String,
        at: Instant,
    },
}

impl Entry {
    fn fingerprint(&self) -> &str {
        match self {
            Entry::InFlight { fingerprint, .. } | Entry::Delivered { fingerprint, .. } => {
                fingerprint
            }
        }
    }
}

/// Result of trying to claim a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the key and must call `complete` or `release`.
    Claimed,
    /// The key was already delivered; reuse this submission id.
    Delivered(String),
    /// Another request with this key is still being delivered.
    InFlight,
    /// The key is bound to a different submission.
    Mismatch,
}

/// In-memory idempotency ledger.
#[derive(Debug)]
pub struct IdempotencyLedger {
    window: Duration,
    in_flight_timeout: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl IdempotencyLedger {
    /// Create a ledger that remembers delivered keys for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            in_flight_timeout: window.min(DEFAULT_IN_FLIGHT_TIMEOUT),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Set how long a key may stay in flight before another request may take it over.
    pub fn with_in_flight_timeout(mut self, timeout: Duration) -> Self {
        self.in_flight_timeout = timeout;
        self
    }

    fn is_live(&self, entry: &Entry) -> bool {
        match entry {
            Entry::InFlight { since, .. } => since.elapsed() < self.in_flight_timeout,
            Entry::Delivered { at, .. } => at.elapsed() < self.window,
        }
    }

    /// Try to claim `key` for a new delivery of the submission identified by `fingerprint`.
    pub fn claim(&self, key: &str, fingerprint: &str) -> Claim {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get(key).filter(|e| self.is_live(e)) {
            if entry.fingerprint() != fingerprint {
                return Claim::Mismatch;
            }
            return match entry {
                Entry::InFlight { .. } => Claim::InFlight,
                Entry::Delivered { submission_id, .. } => Claim::Delivered(submission_id.clone()),
            };
        }

        entries.insert(
            key.to_string(),
            Entry::InFlight {
                fingerprint: fingerprint.to_string(),
                since: Instant::now(),
            },
        );
        Claim::Claimed
    }

    /// Record that the delivery for `key` succeeded.
    pub fn complete(&self, key: &str, submission_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(key) {
            let fingerprint = entry.fingerprint().to_string();
            *entry = Entry::Delivered {
                fingerprint,
                submission_id: submission_id.to_string(),
                at: Instant::now(),
            };
        }
    }

    /// Forget `key` after a failed delivery. Delivered keys are kept.
    pub fn release(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(entries.get(key), Some(Entry::InFlight { .. })) {
            entries.remove(key);
        }
    }

    /// Hold a claimed `key` until the delivery finishes.
    ///
    /// The key is released when the guard is dropped without being completed,
    /// including when the submitting future is cancelled.
    pub fn guard<'a>(&'a self, key: &str) -> KeyGuard<'a> {
        KeyGuard {
            ledger: self,
            key: key.to_string(),
            armed: true,
        }
    }

    /// Drop delivered keys older than the window and abandoned in-flight keys.
    /// Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| self.is_live(entry));
        before - entries.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A claimed key that is released on drop unless completed.
#[must_use = "dropping the guard releases the key"]
pub struct KeyGuard<'a> {
    ledger: &'a IdempotencyLedger,
    key: String,
    armed: bool,
}

impl KeyGuard<'_> {
    /// Record the delivery and keep the key.
    pub fn complete(mut self, submission_id: &str) {
        self.ledger.complete(&self.key, submission_id);
        self.armed = false;
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(key = %self.key, "Releasing unfinished idempotency key");
            self.ledger.release(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FP: &str = "fp-1";

    #[test]
    fn test_first_claim_succeeds() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        assert_eq!(ledger.claim("abc", FP), Claim::Claimed);
    }

    #[test]
    fn test_claim_while_in_flight() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        assert_eq!(ledger.claim("abc", FP), Claim::InFlight);
    }

    #[test]
    fn test_claim_after_delivery_replays() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        ledger.complete("abc", "sub-1");
        assert_eq!(ledger.claim("abc", FP), Claim::Delivered("sub-1".to_string()));
    }

    #[test]
    fn test_claim_with_other_fingerprint_mismatches() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        assert_eq!(ledger.claim("abc", "fp-2"), Claim::Mismatch);

        ledger.complete("abc", "sub-1");
        assert_eq!(ledger.claim("abc", "fp-2"), Claim::Mismatch);
        assert_eq!(ledger.claim("abc", FP), Claim::Delivered("sub-1".to_string()));
    }

    #[test]
    fn test_release_allows_retry() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        ledger.release("abc");
        assert_eq!(ledger.claim("abc", FP), Claim::Claimed);
    }

    #[test]
    fn test_release_keeps_delivered_entry() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        ledger.complete("abc", "sub-1");
        ledger.release("abc");
        assert_eq!(ledger.claim("abc", FP), Claim::Delivered("sub-1".to_string()));
    }

    #[test]
    fn test_dropped_guard_releases_key() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        drop(ledger.guard("abc"));
        assert!(ledger.is_empty());
        assert_eq!(ledger.claim("abc", FP), Claim::Claimed);
    }

    #[test]
    fn test_completed_guard_keeps_key() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("abc", FP);
        ledger.guard("abc").complete("sub-1");
        assert_eq!(ledger.claim("abc", FP), Claim::Delivered("sub-1".to_string()));
    }

    #[test]
    fn test_expired_delivery_can_be_claimed_again() {
        let ledger = IdempotencyLedger::new(Duration::ZERO);
        ledger.claim("abc", FP);
        ledger.complete("abc", "sub-1");
        assert_eq!(ledger.claim("abc", "fp-2"), Claim::Claimed);
    }

    #[test]
    fn test_abandoned_in_flight_key_can_be_taken_over() {
        let ledger =
            IdempotencyLedger::new(Duration::from_secs(60)).with_in_flight_timeout(Duration::ZERO);
        ledger.claim("abc", FP);
        assert_eq!(ledger.claim("abc", FP), Claim::Claimed);
    }

    #[test]
    fn test_in_flight_timeout_bounded_by_window() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(3600));
        assert_eq!(ledger.in_flight_timeout, DEFAULT_IN_FLIGHT_TIMEOUT);

        let ledger = IdempotencyLedger::new(Duration::from_secs(10));
        assert_eq!(ledger.in_flight_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_purge_expired() {
        let ledger = IdempotencyLedger::new(Duration::ZERO);
        ledger.claim("delivered", FP);
        ledger.complete("delivered", "sub-1");
        ledger.claim("pending", FP);

        // Both the expired delivery and the stale in-flight key go
        assert_eq!(ledger.purge_expired(), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_purge_keeps_live_entries() {
        let ledger = IdempotencyLedger::new(Duration::from_secs(60));
        ledger.claim("delivered", FP);
        ledger.complete("delivered", "sub-1");
        ledger.claim("pending", FP);

        assert_eq!(ledger.purge_expired(), 0);
        assert_eq!(ledger.len(), 2);
    }
}
