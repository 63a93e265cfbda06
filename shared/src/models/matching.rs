//! Sale-line matching status, FIFO allocation planning and cost averaging

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Matching status of a sale-document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Partial,
    Matched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Partial => "partial",
            MatchStatus::Matched => "matched",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MatchStatus::Pending),
            "partial" => Some(MatchStatus::Partial),
            "matched" => Some(MatchStatus::Matched),
            _ => None,
        }
    }
}

/// One allocation of lot quantity against a sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub lot_id: Uuid,
    pub quantity: Decimal,
}

/// A lot candidate for FIFO planning: id plus its remaining quantity, in
/// FIFO order (purchase date ascending, id ascending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoCandidate {
    pub lot_id: Uuid,
    pub remaining_quantity: Decimal,
}

/// Greedy FIFO allocation: consume `min(remaining, still needed)` from each
/// candidate in order until the demand is satisfied or candidates run out.
///
/// A shortfall is not an error; the caller reads the unallocated remainder
/// off the returned plan. Candidates with no remaining stock are skipped.
pub fn plan_fifo(candidates: &[FifoCandidate], demand: Decimal) -> Vec<Allocation> {
    let mut plan = Vec::new();
    let mut needed = demand;

    for candidate in candidates {
        if needed <= Decimal::ZERO {
            break;
        }
        if candidate.remaining_quantity <= Decimal::ZERO {
            continue;
        }
        let take = candidate.remaining_quantity.min(needed);
        plan.push(Allocation {
            lot_id: candidate.lot_id,
            quantity: take,
        });
        needed -= take;
    }

    plan
}

/// Total quantity covered by an allocation plan.
pub fn planned_total(plan: &[Allocation]) -> Decimal {
    plan.iter().map(|a| a.quantity).sum()
}

/// Weighted-average unit cost over `(quantity, unit_price)` pairs.
///
/// Returns `None` when the pairs cover no quantity, which callers store as a
/// cleared cost rather than zero.
pub fn weighted_average_cost(parts: &[(Decimal, Decimal)]) -> Option<Decimal> {
    let total_quantity: Decimal = parts.iter().map(|(q, _)| *q).sum();
    if total_quantity <= Decimal::ZERO {
        return None;
    }
    let total_value: Decimal = parts.iter().map(|(q, p)| q * p).sum();
    Some(total_value / total_quantity)
}

/// Matching status derived from the matched total against the ordered
/// quantity.
pub fn match_status_for(matched: Decimal, ordered: Decimal) -> MatchStatus {
    if matched <= Decimal::ZERO {
        MatchStatus::Pending
    } else if matched < ordered {
        MatchStatus::Partial
    } else {
        MatchStatus::Matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn candidate(remaining: &str) -> FifoCandidate {
        FifoCandidate {
            lot_id: Uuid::new_v4(),
            remaining_quantity: dec(remaining),
        }
    }

    #[test]
    fn test_fifo_consumes_oldest_first() {
        let a = candidate("5");
        let b = candidate("5");
        let plan = plan_fifo(&[a.clone(), b.clone()], dec("7"));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].lot_id, a.lot_id);
        assert_eq!(plan[0].quantity, dec("5"));
        assert_eq!(plan[1].lot_id, b.lot_id);
        assert_eq!(plan[1].quantity, dec("2"));
    }

    #[test]
    fn test_fifo_shortfall_is_partial_plan() {
        let plan = plan_fifo(&[candidate("3")], dec("10"));
        assert_eq!(planned_total(&plan), dec("3"));
    }

    #[test]
    fn test_fifo_skips_empty_candidates() {
        let empty = candidate("0");
        let stocked = candidate("4");
        let plan = plan_fifo(&[empty, stocked.clone()], dec("2"));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_id, stocked.lot_id);
    }

    #[test]
    fn test_weighted_average_cost() {
        // 30 units at 10 + 10 units at 30 -> (300 + 300) / 40 = 15
        let cost = weighted_average_cost(&[(dec("30"), dec("10")), (dec("10"), dec("30"))]);
        assert_eq!(cost, Some(dec("15")));
    }

    #[test]
    fn test_weighted_average_cost_empty() {
        assert_eq!(weighted_average_cost(&[]), None);
        assert_eq!(weighted_average_cost(&[(Decimal::ZERO, dec("10"))]), None);
    }

    #[test]
    fn test_match_status_thresholds() {
        assert_eq!(match_status_for(Decimal::ZERO, dec("50")), MatchStatus::Pending);
        assert_eq!(match_status_for(dec("30"), dec("50")), MatchStatus::Partial);
        assert_eq!(match_status_for(dec("50"), dec("50")), MatchStatus::Matched);
    }
}
