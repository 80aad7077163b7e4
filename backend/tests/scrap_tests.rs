//! Scrap adjuster tests
//!
//! Tests for the scrap type branching (ledger impact, merge keys) and the
//! clamped add-back amount.

use proptest::prelude::*;
use shared::models::{clamp_add_back, clamp_decrement, ScrapType};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Only returns skip the immediate ledger decrement
    #[test]
    fn test_ledger_impact_per_type() {
        assert!(ScrapType::Damaged.decrements_inventory());
        assert!(ScrapType::Other.decrements_inventory());
        assert!(!ScrapType::Returned.decrements_inventory());
    }

    /// Only returns carry the customer in their merge key
    #[test]
    fn test_merge_key_per_type() {
        assert!(ScrapType::Returned.merges_per_customer());
        assert!(!ScrapType::Damaged.merges_per_customer());
        assert!(!ScrapType::Other.merges_per_customer());
    }

    /// Scrap types round-trip through their wire strings
    #[test]
    fn test_scrap_type_strings() {
        for scrap_type in [ScrapType::Damaged, ScrapType::Returned, ScrapType::Other] {
            assert_eq!(ScrapType::from_str(scrap_type.as_str()), Some(scrap_type));
        }
        assert_eq!(ScrapType::from_str("broken"), None);
    }

    /// Repeated damage events against one inventory row accumulate,
    /// and the ledger shrinks by the same amounts
    #[test]
    fn test_damage_accumulation() {
        let mut scrap_quantity = 0i64;
        let mut ledger = 20i64;
        for amount in [3, 2, 4] {
            scrap_quantity += amount;
            ledger = clamp_decrement(ledger, amount);
        }
        assert_eq!(scrap_quantity, 9);
        assert_eq!(ledger, 11);
    }

    /// An add-back without an explicit amount moves the whole scrap
    #[test]
    fn test_add_back_defaults_to_full_quantity() {
        assert_eq!(clamp_add_back(7, None), 7);
    }

    /// Partial add-backs move what was asked for
    #[test]
    fn test_partial_add_back() {
        assert_eq!(clamp_add_back(7, Some(3)), 3);
    }

    /// Asking for more than the scrap holds is clamped, not an error
    #[test]
    fn test_add_back_clamped_to_scrap_quantity() {
        assert_eq!(clamp_add_back(7, Some(50)), 7);
    }

    /// Non-positive requests move nothing
    #[test]
    fn test_add_back_ignores_negative_request() {
        assert_eq!(clamp_add_back(7, Some(0)), 0);
        assert_eq!(clamp_add_back(7, Some(-2)), 0);
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

        /// The moved amount never exceeds what the scrap holds
        #[test]
        fn prop_add_back_bounded(
            scrap_quantity in 1i64..=10_000,
            requested in proptest::option::of(-100i64..=20_000)
        ) {
            let moved = clamp_add_back(scrap_quantity, requested);
            prop_assert!(moved >= 0);
            prop_assert!(moved <= scrap_quantity);
        }

        /// After an add-back the remaining scrap quantity is non-negative
        /// and conserved: moved plus remaining equals the original
        #[test]
        fn prop_add_back_conserves_quantity(
            scrap_quantity in 1i64..=10_000,
            requested in proptest::option::of(1i64..=20_000)
        ) {
            let moved = clamp_add_back(scrap_quantity, requested);
            let remaining = scrap_quantity - moved;
            prop_assert!(remaining >= 0);
            prop_assert_eq!(moved + remaining, scrap_quantity);
        }

        /// Accumulated damage events equal the sum of their amounts
        #[test]
        fn prop_accumulation_sums(
            amounts in prop::collection::vec(1i64..=500, 1..15)
        ) {
            let total: i64 = amounts.iter().sum();
            let mut scrap_quantity = 0i64;
            for amount in &amounts {
                scrap_quantity += amount;
            }
            prop_assert_eq!(scrap_quantity, total);
        }
    }
}
