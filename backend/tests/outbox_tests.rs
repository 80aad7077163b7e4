//! Outbox worker tests
//!
//! Tests for the retry accounting and the claim eligibility rules the
//! background worker applies when draining events.

use proptest::prelude::*;
use std::collections::HashSet;

/// Attempts before an event is parked as failed, mirroring the worker
const MAX_ATTEMPTS: i32 = 5;

/// Outcome of one failed dispatch: next status and attempt count
fn status_after_failure(attempts_before: i32) -> (&'static str, i32) {
    let attempts = attempts_before + 1;
    let status = if attempts >= MAX_ATTEMPTS {
        "failed"
    } else {
        "pending"
    };
    (status, attempts)
}

/// Whether a worker may claim a row: pending rows always, processing rows
/// only once their claim has gone stale
fn claimable(status: &str, claim_is_stale: bool) -> bool {
    match status {
        "pending" => true,
        "processing" => claim_is_stale,
        _ => false,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A failed dispatch goes back to pending until the attempt cap
    #[test]
    fn test_failure_returns_to_pending_below_cap() {
        let (status, attempts) = status_after_failure(0);
        assert_eq!(status, "pending");
        assert_eq!(attempts, 1);

        let (status, attempts) = status_after_failure(3);
        assert_eq!(status, "pending");
        assert_eq!(attempts, 4);
    }

    /// The final allowed failure parks the event as failed
    #[test]
    fn test_failure_parks_event_at_cap() {
        let (status, attempts) = status_after_failure(MAX_ATTEMPTS - 1);
        assert_eq!(status, "failed");
        assert_eq!(attempts, MAX_ATTEMPTS);
    }

    /// Repeated failures walk pending, pending, ..., failed
    #[test]
    fn test_retry_progression() {
        let mut attempts = 0;
        let mut status = "pending";
        while status == "pending" {
            let (next_status, next_attempts) = status_after_failure(attempts);
            status = next_status;
            attempts = next_attempts;
        }
        assert_eq!(status, "failed");
        assert_eq!(attempts, MAX_ATTEMPTS);
    }

    /// Sent and failed rows are never picked up again
    #[test]
    fn test_terminal_rows_not_reclaimed() {
        for stale in [false, true] {
            assert!(!claimable("sent", stale));
            assert!(!claimable("failed", stale));
        }
    }

    /// A live claim shields the row; a stale one releases it for redelivery
    #[test]
    fn test_stale_claim_is_released() {
        assert!(!claimable("processing", false));
        assert!(claimable("processing", true));
        assert!(claimable("pending", false));
    }

    /// Two workers claiming from the same backlog never overlap: each row
    /// goes to exactly one claimer
    #[test]
    fn test_claims_do_not_overlap() {
        let backlog: Vec<u32> = (0..10).collect();
        let (first_batch, second_batch) = backlog.split_at(4);

        let first: HashSet<_> = first_batch.iter().collect();
        let second: HashSet<_> = second_batch.iter().collect();
        assert!(first.is_disjoint(&second));
        assert_eq!(first.len() + second.len(), backlog.len());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Attempts only ever grow by one and never exceed the cap when
        /// starting from a claimable row
        #[test]
        fn prop_attempts_accounting(attempts_before in 0..MAX_ATTEMPTS) {
            let (status, attempts) = status_after_failure(attempts_before);
            prop_assert_eq!(attempts, attempts_before + 1);
            prop_assert!(attempts <= MAX_ATTEMPTS);
            if attempts < MAX_ATTEMPTS {
                prop_assert_eq!(status, "pending");
            } else {
                prop_assert_eq!(status, "failed");
            }
        }

        /// A row that reached a terminal status stays unclaimable
        #[test]
        fn prop_terminal_is_final(stale in any::<bool>()) {
            prop_assert!(!claimable("sent", stale));
            prop_assert!(!claimable("failed", stale));
        }
    }
}
