//! Inventory ledger tests
//!
//! Tests for the clamp-to-zero decrement semantics and the derived
//! availability status.

use proptest::prelude::*;
use shared::models::{apply_decrement, clamp_decrement, InventoryStatus};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Decrementing within the available quantity applies in full
    #[test]
    fn test_decrement_within_stock() {
        let (new_quantity, fully_applied) = apply_decrement(10, 4);
        assert_eq!(new_quantity, 6);
        assert!(fully_applied);
    }

    /// Oversized decrements clamp to zero instead of erroring
    #[test]
    fn test_oversized_decrement_clamps_to_zero() {
        let (new_quantity, fully_applied) = apply_decrement(6, 20);
        assert_eq!(new_quantity, 0);
        assert!(!fully_applied);
    }

    /// Draining the exact quantity leaves zero and counts as fully applied
    #[test]
    fn test_exact_decrement() {
        let (new_quantity, fully_applied) = apply_decrement(5, 5);
        assert_eq!(new_quantity, 0);
        assert!(fully_applied);
    }

    /// Decrementing an empty counter stays at zero
    #[test]
    fn test_decrement_empty_counter() {
        let (new_quantity, fully_applied) = apply_decrement(0, 3);
        assert_eq!(new_quantity, 0);
        assert!(!fully_applied);
    }

    /// Status follows the quantity, never stored independently
    #[test]
    fn test_status_derivation() {
        assert_eq!(InventoryStatus::from_quantity(1), InventoryStatus::Available);
        assert_eq!(InventoryStatus::from_quantity(100), InventoryStatus::Available);
        assert_eq!(InventoryStatus::from_quantity(0), InventoryStatus::OutOfStock);
    }

    /// Status strings round-trip through their wire form
    #[test]
    fn test_status_strings() {
        assert_eq!(InventoryStatus::Available.as_str(), "available");
        assert_eq!(InventoryStatus::OutOfStock.as_str(), "out_of_stock");
        assert_eq!(
            InventoryStatus::from_str("available"),
            Some(InventoryStatus::Available)
        );
        assert_eq!(InventoryStatus::from_str("sold_out"), None);
    }

    /// Administrative adjustments compose with the same clamp rules as the
    /// workflow mutations: set overrides, increment adds, decrement clamps
    #[test]
    fn test_adjustment_sequence() {
        // set to 25, receive 10 more, then an oversized correction
        let mut quantity = 25i64;
        quantity += 10;
        quantity = clamp_decrement(quantity, 50);

        assert_eq!(quantity, 0);
        assert_eq!(
            InventoryStatus::from_quantity(quantity),
            InventoryStatus::OutOfStock
        );
    }

    /// A sale drains stock line by line
    #[test]
    fn test_sequence_of_decrements() {
        let mut quantity = 10;
        for amount in [3, 3, 3] {
            quantity = clamp_decrement(quantity, amount);
        }
        assert_eq!(quantity, 1);

        // One more oversized pull empties the counter
        quantity = clamp_decrement(quantity, 5);
        assert_eq!(quantity, 0);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = i64> {
        0i64..=10_000
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The ledger quantity never goes negative, whatever is subtracted
        #[test]
        fn prop_quantity_never_negative(
            current in quantity_strategy(),
            amount in quantity_strategy()
        ) {
            let (new_quantity, _) = apply_decrement(current, amount);
            prop_assert!(new_quantity >= 0);
        }

        /// A decrement never increases the quantity
        #[test]
        fn prop_decrement_monotonic(
            current in quantity_strategy(),
            amount in quantity_strategy()
        ) {
            let (new_quantity, _) = apply_decrement(current, amount);
            prop_assert!(new_quantity <= current);
        }

        /// The applied flag is set exactly when the full amount fit
        #[test]
        fn prop_applied_flag_matches_arithmetic(
            current in quantity_strategy(),
            amount in quantity_strategy()
        ) {
            let (new_quantity, fully_applied) = apply_decrement(current, amount);
            if fully_applied {
                prop_assert_eq!(new_quantity, current - amount);
            } else {
                prop_assert_eq!(new_quantity, 0);
                prop_assert!(amount > current);
            }
        }

        /// Applying a sequence of decrements keeps the running quantity valid
        #[test]
        fn prop_sequence_stays_valid(
            start in quantity_strategy(),
            amounts in prop::collection::vec(1i64..=500, 0..20)
        ) {
            let mut quantity = start;
            for amount in amounts {
                quantity = clamp_decrement(quantity, amount);
                prop_assert!(quantity >= 0);
                prop_assert_eq!(
                    InventoryStatus::from_quantity(quantity),
                    if quantity > 0 {
                        InventoryStatus::Available
                    } else {
                        InventoryStatus::OutOfStock
                    }
                );
            }
        }
    }
}
