//! Matching engine tests
//!
//! Covers FIFO allocation determinism, the no-oversell invariants, and the
//! sale-line status/cost writeback including recomputation after unmatch.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::matching::{
    match_status_for, plan_fifo, planned_total, weighted_average_cost, Allocation, FifoCandidate,
    MatchStatus,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn candidate(remaining: &str) -> FifoCandidate {
    FifoCandidate {
        lot_id: Uuid::new_v4(),
        remaining_quantity: dec(remaining),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Lots A(qty=5) and B(qty=5): a demand of 7 takes 5 from A and 2 from
    /// B, never touching B before A is exhausted
    #[test]
    fn test_fifo_allocates_oldest_first() {
        let a = candidate("5");
        let b = candidate("5");
        let plan = plan_fifo(&[a.clone(), b.clone()], dec("7"));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].lot_id, a.lot_id);
        assert_eq!(plan[0].quantity, dec("5"));
        assert_eq!(plan[1].lot_id, b.lot_id);
        assert_eq!(plan[1].quantity, dec("2"));
    }

    /// A demand satisfiable by the first lot never opens the second
    #[test]
    fn test_fifo_stops_once_satisfied() {
        let a = candidate("10");
        let b = candidate("10");
        let plan = plan_fifo(&[a.clone(), b], dec("4"));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_id, a.lot_id);
        assert_eq!(plan[0].quantity, dec("4"));
    }

    /// Partial fulfillment is an outcome, not an error
    #[test]
    fn test_fifo_partial_plan_on_shortfall() {
        let plan = plan_fifo(&[candidate("3"), candidate("2")], dec("10"));
        assert_eq!(planned_total(&plan), dec("5"));
    }

    /// Matching status thresholds against the ordered quantity
    #[test]
    fn test_match_status() {
        assert_eq!(match_status_for(dec("0"), dec("50")), MatchStatus::Pending);
        assert_eq!(match_status_for(dec("30"), dec("50")), MatchStatus::Partial);
        assert_eq!(match_status_for(dec("50"), dec("50")), MatchStatus::Matched);
        // matched 30 against an ordered quantity of 30
        assert_eq!(match_status_for(dec("30"), dec("30")), MatchStatus::Matched);
    }

    /// Weighted-average cost over the matched quantities
    #[test]
    fn test_weighted_average_cost() {
        // 30 units from a lot priced 10, 10 units from a lot priced 30
        let cost = weighted_average_cost(&[(dec("30"), dec("10")), (dec("10"), dec("30"))]);
        assert_eq!(cost, Some(dec("15")));
    }

    /// Removing a match recomputes the cost from what remains; removing the
    /// last match clears it entirely rather than keeping the stale average
    #[test]
    fn test_cost_recomputed_after_unmatch() {
        let mut matches = vec![(dec("30"), dec("10")), (dec("10"), dec("30"))];
        assert_eq!(weighted_average_cost(&matches), Some(dec("15")));

        // unmatch the 10-unit allocation
        matches.pop();
        assert_eq!(weighted_average_cost(&matches), Some(dec("10")));

        // unmatch everything
        matches.pop();
        assert_eq!(weighted_average_cost(&matches), None);
    }

    /// Status falls back from matched through partial to pending as
    /// matchings are removed
    #[test]
    fn test_status_recomputed_after_unmatch() {
        let ordered = dec("40");
        assert_eq!(match_status_for(dec("40"), ordered), MatchStatus::Matched);
        assert_eq!(match_status_for(dec("10"), ordered), MatchStatus::Partial);
        assert_eq!(match_status_for(dec("0"), ordered), MatchStatus::Pending);
    }
}

// ============================================================================
// Simulation Helpers
// ============================================================================

/// Apply a plan against lot balances, consuming at most what each lot
/// holds, the way the engine re-fits a plan after locking.
fn apply_plan(balances: &mut Vec<FifoCandidate>, demand: Decimal) -> Vec<Allocation> {
    let plan = plan_fifo(balances, demand);
    let mut applied = Vec::new();
    let mut needed = demand;
    for allocation in plan {
        if needed <= Decimal::ZERO {
            break;
        }
        let lot = balances
            .iter_mut()
            .find(|l| l.lot_id == allocation.lot_id)
            .unwrap();
        let take = lot.remaining_quantity.min(needed);
        if take <= Decimal::ZERO {
            continue;
        }
        lot.remaining_quantity -= take;
        needed -= take;
        applied.push(Allocation {
            lot_id: allocation.lot_id,
            quantity: take,
        });
    }
    applied
}

#[cfg(test)]
mod simulation_tests {
    use super::*;

    /// Two competing FIFO matches with combined demand above the total
    /// supply never allocate more than the lots hold in aggregate
    #[test]
    fn test_competing_matches_never_oversell() {
        let mut balances = vec![candidate("5"), candidate("5")];
        let supply: Decimal = balances.iter().map(|l| l.remaining_quantity).sum();

        let first = apply_plan(&mut balances, dec("7"));
        let second = apply_plan(&mut balances, dec("7"));

        let allocated: Decimal = planned_total(&first) + planned_total(&second);
        assert_eq!(allocated, supply);
        for lot in &balances {
            assert!(lot.remaining_quantity >= Decimal::ZERO);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    fn candidates_strategy() -> impl Strategy<Value = Vec<FifoCandidate>> {
        prop::collection::vec(quantity_strategy(), 1..12).prop_map(|quantities| {
            quantities
                .into_iter()
                .map(|q| FifoCandidate {
                    lot_id: Uuid::new_v4(),
                    remaining_quantity: q,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The plan never exceeds the demand nor any lot's balance
        #[test]
        fn prop_plan_within_demand_and_supply(
            candidates in candidates_strategy(),
            demand in quantity_strategy()
        ) {
            let plan = plan_fifo(&candidates, demand);

            prop_assert!(planned_total(&plan) <= demand);
            for allocation in &plan {
                let lot = candidates.iter().find(|l| l.lot_id == allocation.lot_id).unwrap();
                prop_assert!(allocation.quantity > Decimal::ZERO);
                prop_assert!(allocation.quantity <= lot.remaining_quantity);
            }
        }

        /// A younger lot is only opened after every older lot is exhausted
        /// by the plan
        #[test]
        fn prop_plan_exhausts_older_lots_first(
            candidates in candidates_strategy(),
            demand in quantity_strategy()
        ) {
            let plan = plan_fifo(&candidates, demand);

            // every allocation except the last must fully drain its lot
            for allocation in plan.iter().rev().skip(1) {
                let lot = candidates.iter().find(|l| l.lot_id == allocation.lot_id).unwrap();
                prop_assert_eq!(allocation.quantity, lot.remaining_quantity);
            }
        }

        /// The plan covers min(demand, total supply)
        #[test]
        fn prop_plan_covers_min_of_demand_and_supply(
            candidates in candidates_strategy(),
            demand in quantity_strategy()
        ) {
            let supply: Decimal = candidates.iter().map(|l| l.remaining_quantity).sum();
            let plan = plan_fifo(&candidates, demand);

            prop_assert_eq!(planned_total(&plan), demand.min(supply));
        }

        /// Sequential competing demands never drive any balance negative
        /// and never allocate beyond the supply
        #[test]
        fn prop_competing_demands_never_oversell(
            quantities in prop::collection::vec(quantity_strategy(), 1..8),
            demands in prop::collection::vec(quantity_strategy(), 1..5)
        ) {
            let mut balances: Vec<FifoCandidate> = quantities
                .iter()
                .map(|q| FifoCandidate { lot_id: Uuid::new_v4(), remaining_quantity: *q })
                .collect();
            let supply: Decimal = quantities.iter().sum();

            let mut allocated = Decimal::ZERO;
            for demand in demands {
                allocated += planned_total(&apply_plan(&mut balances, demand));
            }

            prop_assert!(allocated <= supply);
            for lot in &balances {
                prop_assert!(lot.remaining_quantity >= Decimal::ZERO);
            }
        }

        /// The weighted average sits between the cheapest and the dearest
        /// matched lot
        #[test]
        fn prop_weighted_average_bounded(
            parts in prop::collection::vec(
                (quantity_strategy(), quantity_strategy()),
                1..10
            )
        ) {
            let cost = weighted_average_cost(&parts).unwrap();
            let min_price = parts.iter().map(|(_, p)| *p).min().unwrap();
            let max_price = parts.iter().map(|(_, p)| *p).max().unwrap();

            prop_assert!(cost >= min_price);
            prop_assert!(cost <= max_price);
        }
    }
}
