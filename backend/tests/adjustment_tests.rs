//! Adjustment and vendor-return tests

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::lot::{prorated_weight, status_for_quantity, LotStatus};
use shared::models::stock::AdjustmentKind;
use shared::validation::{validate_nonzero_delta, validate_reason};

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

    /// The non-negativity precondition: remaining + delta must not go below
    /// zero at application time
    #[test]
    fn test_delta_non_negativity() {
        let applicable = |remaining: Decimal, delta: Decimal| remaining + delta >= Decimal::ZERO;

        assert!(applicable(dec("10"), dec("-10")));
        assert!(!applicable(dec("10"), dec("-10.001")));
        assert!(applicable(dec("0"), dec("5")));
    }

    /// Adjusting to exactly zero depletes the lot
    #[test]
    fn test_full_depletion_projects_depleted() {
        let remaining = dec("10") + dec("-10");
        assert_eq!(status_for_quantity(remaining), LotStatus::Depleted);
    }

    /// A found quantity on a depleted lot makes it available again
    #[test]
    fn test_found_quantity_reactivates_lot() {
        let remaining = Decimal::ZERO + dec("3");
        assert_eq!(status_for_quantity(remaining), LotStatus::Available);
    }

    /// Adjust then revert restores the original quantity and weight
    #[test]
    fn test_adjust_revert_round_trip() {
        let mut remaining = dec("50");
        let mut weight = dec("100");

        let delta = dec("-8");
        let weight_delta = prorated_weight(weight, remaining, delta);
        remaining += delta;
        weight += weight_delta;
        assert_eq!(remaining, dec("42"));
        assert_eq!(weight, dec("84"));

        remaining -= delta;
        weight -= weight_delta;
        assert_eq!(remaining, dec("50"));
        assert_eq!(weight, dec("100"));
    }

    /// Reverting a positive adjustment needs the quantity to still be there
    #[test]
    fn test_revert_non_negativity() {
        let revertible = |remaining: Decimal, delta: Decimal| remaining - delta >= Decimal::ZERO;

        // a found 5 was consumed down to 3; taking the 5 back would go negative
        assert!(!revertible(dec("3"), dec("5")));
        assert!(revertible(dec("5"), dec("5")));
    }

    /// Zero deltas and empty reasons are rejected before any lot is touched
    #[test]
    fn test_input_validation() {
        assert!(validate_nonzero_delta(Decimal::ZERO).is_err());
        assert!(validate_nonzero_delta(dec("-1")).is_ok());
        assert!(validate_reason("  ").is_err());
        assert!(validate_reason("damaged crates").is_ok());
    }

    /// All four adjustment kinds survive the storage round trip
    #[test]
    fn test_adjustment_kinds() {
        for kind in [
            AdjustmentKind::Depletion,
            AdjustmentKind::Correction,
            AdjustmentKind::Found,
            AdjustmentKind::Audit,
        ] {
            assert_eq!(AdjustmentKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(AdjustmentKind::from_str("shrinkage"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn signed_delta_strategy() -> impl Strategy<Value = Decimal> {
        (-10000i64..=10000i64)
            .prop_filter("delta must be nonzero", |n| *n != 0)
            .prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Apply-then-revert is an exact identity on quantity and weight
        #[test]
        fn prop_adjust_revert_identity(
            remaining in quantity_strategy(),
            weight in quantity_strategy(),
            delta in signed_delta_strategy()
        ) {
            prop_assume!(remaining + delta >= Decimal::ZERO);

            let weight_delta = prorated_weight(weight, remaining, delta);
            let adjusted_remaining = remaining + delta;
            let adjusted_weight = weight + weight_delta;

            prop_assert_eq!(adjusted_remaining - delta, remaining);
            prop_assert_eq!(adjusted_weight - weight_delta, weight);
        }

        /// The status projection always agrees with the sign of the
        /// adjusted quantity
        #[test]
        fn prop_status_follows_quantity(
            remaining in quantity_strategy(),
            delta in signed_delta_strategy()
        ) {
            let adjusted = remaining + delta;
            let status = status_for_quantity(adjusted);

            if adjusted > Decimal::ZERO {
                prop_assert_eq!(status, LotStatus::Available);
            } else {
                prop_assert_eq!(status, LotStatus::Depleted);
            }
        }
    }
}
