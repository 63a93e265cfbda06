//! Production/repack service tests
//!
//! Covers the derived output unit cost, the cancellation guard and the
//! produce/cancel round trip.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::lot::prorated_weight;
use shared::models::stock::production_unit_cost;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Minimal ingredient lot state for round-trip simulation
#[derive(Debug, Clone, PartialEq)]
struct IngredientLot {
    remaining: Decimal,
    weight: Decimal,
    unit_price: Decimal,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Spec scenario: 4 units at price 100 plus 40 additional cost into 40
    /// output units yields a unit price of 11
    #[test]
    fn test_output_unit_cost_scenario() {
        let ingredient_cost = dec("4") * dec("100");
        let cost = production_unit_cost(ingredient_cost, dec("40"), dec("40"));
        assert_eq!(cost, Some(dec("11")));
    }

    /// Zero or negative output quantity has no defined unit cost
    #[test]
    fn test_output_unit_cost_requires_positive_quantity() {
        assert_eq!(production_unit_cost(dec("100"), dec("0"), Decimal::ZERO), None);
        assert_eq!(production_unit_cost(dec("100"), dec("0"), dec("-5")), None);
    }

    /// Blending two ingredients accumulates their cost
    #[test]
    fn test_blend_cost_accumulates() {
        let lots = [
            IngredientLot {
                remaining: dec("10"),
                weight: dec("20"),
                unit_price: dec("100"),
            },
            IngredientLot {
                remaining: dec("6"),
                weight: dec("12"),
                unit_price: dec("50"),
            },
        ];
        let uses = [dec("4"), dec("6")];

        let ingredient_cost: Decimal = lots
            .iter()
            .zip(uses.iter())
            .map(|(lot, use_quantity)| lot.unit_price * use_quantity)
            .sum();
        // 4*100 + 6*50 = 700
        assert_eq!(ingredient_cost, dec("700"));

        let cost = production_unit_cost(ingredient_cost, dec("20"), dec("36"));
        assert_eq!(cost, Some(dec("20")));
    }

    /// Cancelling a production restores every ingredient to its prior state
    #[test]
    fn test_cancel_restores_ingredients() {
        let mut lot = IngredientLot {
            remaining: dec("10"),
            weight: dec("25"),
            unit_price: dec("100"),
        };
        let before = lot.clone();

        // consume 4 units for production
        let consumed_weight = prorated_weight(lot.weight, lot.remaining, dec("4"));
        lot.remaining -= dec("4");
        lot.weight -= consumed_weight;
        assert_eq!(lot.remaining, dec("6"));

        // cancel: the recorded consumption comes back exactly
        lot.remaining += dec("4");
        lot.weight += consumed_weight;
        assert_eq!(lot, before);
    }

    /// Cancellation is only allowed while the output is fully untouched
    #[test]
    fn test_cancel_guard() {
        let untouched = |original: Decimal, remaining: Decimal, status: &str| {
            original == remaining && status == "available"
        };

        assert!(untouched(dec("40"), dec("40"), "available"));
        assert!(!untouched(dec("40"), dec("35"), "available"));
        assert!(!untouched(dec("40"), dec("40"), "depleted"));
    }

    /// The output inherits the primary ingredient's position when it is
    /// fully consumed, else sits just after it
    #[test]
    fn test_output_position() {
        let position = |display_order: i32, use_quantity: Decimal, remaining: Decimal| {
            if use_quantity == remaining {
                display_order
            } else {
                display_order + 1
            }
        };

        assert_eq!(position(3, dec("10"), dec("10")), 3);
        assert_eq!(position(3, dec("4"), dec("10")), 4);
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

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The derived unit cost inverts the total-cost construction: when
        /// the full cost is `price * output quantity`, the derived unit
        /// cost is exactly that price, however it is split between
        /// ingredients and additional cost
        #[test]
        fn prop_unit_cost_inverts_total(
            price in quantity_strategy(),
            output_quantity in quantity_strategy(),
            split in 0u32..=100
        ) {
            let total = price * output_quantity;
            let additional_cost = total * Decimal::new(split as i64, 2);
            let ingredient_cost = total - additional_cost;

            let cost = production_unit_cost(ingredient_cost, additional_cost, output_quantity)
                .unwrap();
            prop_assert_eq!(cost, price);
        }

        /// Consuming then restoring every ingredient is an exact round trip
        #[test]
        fn prop_produce_cancel_round_trip(
            quantities in prop::collection::vec((quantity_strategy(), quantity_strategy()), 1..6),
            fraction in 1u32..=100
        ) {
            let mut lots: Vec<IngredientLot> = quantities
                .iter()
                .map(|(remaining, weight)| IngredientLot {
                    remaining: *remaining,
                    weight: *weight,
                    unit_price: Decimal::ONE,
                })
                .collect();
            let before = lots.clone();

            // consume a fraction of each lot, recording exact quantities
            let mut consumed = Vec::new();
            for lot in lots.iter_mut() {
                let use_quantity = lot.remaining * Decimal::new(fraction as i64, 2);
                let weight = prorated_weight(lot.weight, lot.remaining, use_quantity);
                lot.remaining -= use_quantity;
                lot.weight -= weight;
                consumed.push((use_quantity, weight));
            }

            // cancel: restore from the recorded consumption rows
            for (lot, (use_quantity, weight)) in lots.iter_mut().zip(consumed) {
                lot.remaining += use_quantity;
                lot.weight += weight;
            }

            prop_assert_eq!(lots, before);
        }
    }
}
