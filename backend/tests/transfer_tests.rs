//! Stock transfer tests
//!
//! Tests for the lifecycle ordering rules and the merge-by-variant
//! arithmetic used when a transfer lands at the destination store.

use std::collections::HashMap;

use proptest::prelude::*;
use shared::models::{clamp_decrement, TransferStatus};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Only a new transfer can be dispatched
    #[test]
    fn test_dispatch_requires_new() {
        assert!(TransferStatus::New.can_dispatch());
        assert!(!TransferStatus::Dispatched.can_dispatch());
        assert!(!TransferStatus::Accepted.can_dispatch());
        assert!(!TransferStatus::Rejected.can_dispatch());
    }

    /// Accepting requires the stock to be in transit
    #[test]
    fn test_accept_requires_dispatched() {
        assert!(TransferStatus::Dispatched.can_accept());
        assert!(!TransferStatus::New.can_accept());
        assert!(!TransferStatus::Accepted.can_accept());
        assert!(!TransferStatus::Rejected.can_accept());
    }

    /// Rejection is possible until a terminal state is reached
    #[test]
    fn test_reject_before_terminal() {
        assert!(TransferStatus::New.can_reject());
        assert!(TransferStatus::Dispatched.can_reject());
        assert!(!TransferStatus::Accepted.can_reject());
        assert!(!TransferStatus::Rejected.can_reject());
    }

    /// Accepted and rejected are terminal, lines freeze there
    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Accepted.is_terminal());
        assert!(TransferStatus::Rejected.is_terminal());
        assert!(!TransferStatus::Accepted.lines_mutable());
        assert!(TransferStatus::New.lines_mutable());
        assert!(TransferStatus::Dispatched.lines_mutable());
    }

    /// Statuses round-trip through their wire strings
    #[test]
    fn test_status_strings() {
        for status in [
            TransferStatus::New,
            TransferStatus::Dispatched,
            TransferStatus::Accepted,
            TransferStatus::Rejected,
        ] {
            assert_eq!(TransferStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TransferStatus::from_str("in_transit"), None);
    }

    /// Two lines carrying the same variant merge into one destination write
    #[test]
    fn test_lines_merge_by_variant() {
        // (variant, quantity) pairs as they would come off transfer lines
        let lines = [("espresso-250g", 5i64), ("filter-1kg", 2), ("espresso-250g", 3)];

        let mut merged: HashMap<&str, i64> = HashMap::new();
        for (variant, quantity) in lines {
            *merged.entry(variant).or_insert(0) += quantity;
        }

        assert_eq!(merged.len(), 2);
        assert_eq!(merged["espresso-250g"], 8);
        assert_eq!(merged["filter-1kg"], 2);
    }

    /// A dispatched-then-rejected transfer returns stock to the source
    #[test]
    fn test_reject_after_dispatch_restores_source() {
        let mut source = 10i64;
        let transfer_quantity = 4i64;

        // dispatch
        source = clamp_decrement(source, transfer_quantity);
        assert_eq!(source, 6);

        // reject puts the quantity back
        source += transfer_quantity;
        assert_eq!(source, 10);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = TransferStatus> {
        prop_oneof![
            Just(TransferStatus::New),
            Just(TransferStatus::Dispatched),
            Just(TransferStatus::Accepted),
            Just(TransferStatus::Rejected),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// No transition is available out of a terminal state
        #[test]
        fn prop_terminal_states_are_final(status in status_strategy()) {
            if status.is_terminal() {
                prop_assert!(!status.can_dispatch());
                prop_assert!(!status.can_accept());
                prop_assert!(!status.can_reject());
                prop_assert!(!status.lines_mutable());
            }
        }

        /// Dispatch and accept are never available at the same time
        #[test]
        fn prop_dispatch_accept_mutually_exclusive(status in status_strategy()) {
            prop_assert!(!(status.can_dispatch() && status.can_accept()));
        }

        /// Merging lines by variant conserves the total quantity
        #[test]
        fn prop_merge_conserves_quantity(
            lines in prop::collection::vec((0u8..5, 1i64..=500), 1..20)
        ) {
            let total: i64 = lines.iter().map(|(_, q)| q).sum();

            let mut merged: HashMap<u8, i64> = HashMap::new();
            for (variant, quantity) in &lines {
                *merged.entry(*variant).or_insert(0) += quantity;
            }

            let merged_total: i64 = merged.values().sum();
            prop_assert_eq!(merged_total, total);
        }

        /// Dispatch then reject round-trips the source quantity whenever
        /// the source actually held what the transfer claimed
        #[test]
        fn prop_reject_roundtrip(
            source in 0i64..=10_000,
            transfer_quantity in 1i64..=10_000
        ) {
            let after_dispatch = clamp_decrement(source, transfer_quantity);
            let after_reject = after_dispatch + transfer_quantity;

            if transfer_quantity <= source {
                prop_assert_eq!(after_reject, source);
            } else {
                // The dispatch clamped; the reject can only restore what
                // the line claimed, leaving the source at least as full
                prop_assert!(after_reject >= source);
            }
        }
    }
}
