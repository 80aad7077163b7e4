//! Sale engine tests
//!
//! Tests for header totals (tax, discount), line delta reconciliation and
//! the structured discount snapshot.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    compute_totals, quantity_delta, Discount, DiscountSnapshot, PaymentMethod, TaxAmount,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Subtotal is lines plus tax; no discount means total equals subtotal
    #[test]
    fn test_totals_without_discount() {
        let lines = [dec("100.00"), dec("50.00")];
        let tax = TaxAmount::Percent(dec("10"));
        let (subtotal, total) = compute_totals(&lines, &tax, &DiscountSnapshot::None);

        assert_eq!(subtotal, dec("165.00"));
        assert_eq!(total, dec("165.00"));
    }

    /// Absolute tax is added as-is, regardless of the line sum
    #[test]
    fn test_absolute_tax() {
        let lines = [dec("40.00")];
        let tax = TaxAmount::Absolute(dec("7.00"));
        let (subtotal, _) = compute_totals(&lines, &tax, &DiscountSnapshot::None);

        assert_eq!(subtotal, dec("47.00"));
    }

    /// Discount applies to the subtotal, after tax
    #[test]
    fn test_discount_applies_after_tax() {
        let lines = [dec("100.00")];
        let tax = TaxAmount::Percent(dec("10"));
        let discount = DiscountSnapshot::Percentage {
            code: "SUMMER10".to_string(),
            percent: dec("10"),
        };
        let (subtotal, total) = compute_totals(&lines, &tax, &discount);

        assert_eq!(subtotal, dec("110.00"));
        assert_eq!(total, dec("99.0000"));
    }

    /// An empty sale still carries an absolute tax
    #[test]
    fn test_totals_with_no_lines() {
        let tax = TaxAmount::Absolute(dec("5.00"));
        let (subtotal, total) = compute_totals(&[], &tax, &DiscountSnapshot::None);

        assert_eq!(subtotal, dec("5.00"));
        assert_eq!(total, dec("5.00"));
    }

    /// The snapshot survives a round trip through its persisted columns
    #[test]
    fn test_discount_snapshot_from_parts() {
        let snapshot = DiscountSnapshot::from_parts(Some("VIP".to_string()), Some(dec("15")));
        assert_eq!(snapshot.code(), Some("VIP"));
        assert_eq!(snapshot.percent(), Some(dec("15")));

        // A code without a captured percentage is no discount at all
        let empty = DiscountSnapshot::from_parts(Some("VIP".to_string()), None);
        assert_eq!(empty, DiscountSnapshot::None);
    }

    /// Tax mode and value columns rebuild the tagged value
    #[test]
    fn test_tax_from_parts() {
        assert_eq!(
            TaxAmount::from_parts("percent", dec("7")),
            Some(TaxAmount::Percent(dec("7")))
        );
        assert_eq!(
            TaxAmount::from_parts("absolute", dec("12.50")),
            Some(TaxAmount::Absolute(dec("12.50")))
        );
        assert_eq!(TaxAmount::from_parts("flat", dec("1")), None);
    }

    /// Raising a line quantity consumes stock, lowering it returns stock
    #[test]
    fn test_quantity_delta_direction() {
        assert_eq!(quantity_delta(2, 5), 3);
        assert_eq!(quantity_delta(5, 2), -3);
        assert_eq!(quantity_delta(4, 4), 0);
    }

    /// Payment methods round-trip through their wire strings
    #[test]
    fn test_payment_method_strings() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
        ] {
            assert_eq!(PaymentMethod::from_str(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::from_str("cheque"), None);
    }

    /// A negative tax value is rejected before it can shrink the subtotal
    #[test]
    fn test_negative_tax_rejected() {
        use shared::validation::validate_tax_value;

        assert!(validate_tax_value(dec("-1")).is_err());
        assert!(validate_tax_value(dec("-0.01")).is_err());
        assert!(validate_tax_value(dec("0")).is_ok());
        assert!(validate_tax_value(dec("7.5")).is_ok());
    }

    /// Expired and inactive discounts are unusable and must reject the sale
    /// before anything else happens
    #[test]
    fn test_expired_discount_is_not_usable() {
        use chrono::{Duration, Utc};
        use uuid::Uuid;

        let now = Utc::now();
        let expired = Discount {
            id: Uuid::new_v4(),
            code: "OLD".to_string(),
            percentage: dec("10"),
            is_active: true,
            expires_at: Some(now - Duration::days(1)),
            created_at: now - Duration::days(30),
        };
        assert!(!expired.is_usable(now));

        let inactive = Discount {
            is_active: false,
            expires_at: None,
            ..expired.clone()
        };
        assert!(!inactive.is_usable(now));

        let valid = Discount {
            is_active: true,
            expires_at: Some(now + Duration::days(1)),
            ..expired
        };
        assert!(valid.is_usable(now));
    }

    /// A later edit to the discount table must not change a recorded sale:
    /// the snapshot holds the percentage captured at sale time
    #[test]
    fn test_snapshot_is_frozen() {
        let snapshot = DiscountSnapshot::Percentage {
            code: "LAUNCH".to_string(),
            percent: dec("20"),
        };
        let total_then = snapshot.apply(dec("200.00"));

        // The discounts table later drops to 5%; the snapshot is unaffected
        let total_now = snapshot.apply(dec("200.00"));
        assert_eq!(total_then, total_now);
        assert_eq!(total_then, dec("160.0000"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn money_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 10000.00
    }

    fn percent_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100).prop_map(Decimal::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The discount never raises the total above the subtotal
        #[test]
        fn prop_discount_never_increases_total(
            lines in prop::collection::vec(money_strategy(), 1..10),
            tax_pct in percent_strategy(),
            discount_pct in percent_strategy()
        ) {
            let tax = TaxAmount::Percent(tax_pct);
            let discount = DiscountSnapshot::Percentage {
                code: "X".to_string(),
                percent: discount_pct,
            };
            let (subtotal, total) = compute_totals(&lines, &tax, &discount);
            prop_assert!(total <= subtotal);
            prop_assert!(total >= Decimal::ZERO);
        }

        /// Percent tax scales with the line sum
        #[test]
        fn prop_subtotal_includes_tax(
            lines in prop::collection::vec(money_strategy(), 1..10),
            tax_pct in percent_strategy()
        ) {
            let line_sum: Decimal = lines.iter().copied().sum();
            let tax = TaxAmount::Percent(tax_pct);
            let (subtotal, _) = compute_totals(&lines, &tax, &DiscountSnapshot::None);
            prop_assert_eq!(subtotal, line_sum + line_sum * tax_pct / Decimal::from(100));
        }

        /// Applying a delta and then its inverse reconciles to the start
        #[test]
        fn prop_delta_roundtrip(
            previous in 1i64..=1000,
            requested in 1i64..=1000
        ) {
            let delta = quantity_delta(previous, requested);
            let back = quantity_delta(requested, previous);
            prop_assert_eq!(delta + back, 0);
            prop_assert_eq!(previous + delta, requested);
        }
    }
}
