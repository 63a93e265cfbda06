//! Stock event kinds, ledger arithmetic and chronological ordering

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a manual quantity adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Depletion,
    Correction,
    Found,
    Audit,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Depletion => "depletion",
            AdjustmentKind::Correction => "correction",
            AdjustmentKind::Found => "found",
            AdjustmentKind::Audit => "audit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "depletion" => Some(AdjustmentKind::Depletion),
            "correction" => Some(AdjustmentKind::Correction),
            "found" => Some(AdjustmentKind::Found),
            "audit" => Some(AdjustmentKind::Audit),
            _ => None,
        }
    }
}

/// Kind of an entry in the unified stock-event feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEventKind {
    PurchaseIn,
    ProductionIn,
    TransferIn,
    SaleOut,
    TransferOut,
    ProductionOut,
    Adjustment,
    VendorReturn,
}

impl StockEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockEventKind::PurchaseIn => "purchase_in",
            StockEventKind::ProductionIn => "production_in",
            StockEventKind::TransferIn => "transfer_in",
            StockEventKind::SaleOut => "sale_out",
            StockEventKind::TransferOut => "transfer_out",
            StockEventKind::ProductionOut => "production_out",
            StockEventKind::Adjustment => "adjustment",
            StockEventKind::VendorReturn => "vendor_return",
        }
    }

    /// Tie-break rank at equal timestamps: genesis events (stock appearing)
    /// sort before consuming events, so a ledger never shows stock leaving a
    /// lot before it arrived.
    pub fn priority(&self) -> u8 {
        match self {
            StockEventKind::PurchaseIn => 0,
            StockEventKind::ProductionIn => 1,
            StockEventKind::TransferIn => 2,
            StockEventKind::SaleOut => 3,
            StockEventKind::TransferOut => 4,
            StockEventKind::ProductionOut => 5,
            StockEventKind::Adjustment => 6,
            StockEventKind::VendorReturn => 7,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.priority() <= 2
    }
}

/// Sort key of a stock event in the chronological feed: business date, then
/// event timestamp, then genesis-first type priority, then reference id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockEventOrder {
    pub transaction_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
    pub kind: StockEventKind,
    pub reference_id: Uuid,
}

impl Ord for StockEventOrder {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.transaction_date
            .cmp(&other.transaction_date)
            .then(self.occurred_at.cmp(&other.occurred_at))
            .then(self.kind.priority().cmp(&other.kind.priority()))
            .then(self.reference_id.cmp(&other.reference_id))
    }
}

impl PartialOrd for StockEventOrder {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Unit cost of a production output:
/// `(sum of ingredient cost + additional cost) / output quantity`.
///
/// Returns `None` for a non-positive output quantity.
pub fn production_unit_cost(
    ingredient_cost: Decimal,
    additional_cost: Decimal,
    output_quantity: Decimal,
) -> Option<Decimal> {
    if output_quantity <= Decimal::ZERO {
        return None;
    }
    Some((ingredient_cost + additional_cost) / output_quantity)
}

/// Remaining quantity a lot should hold given its full event history.
///
/// `adjusted` is the signed sum of adjustment deltas; all other terms are
/// non-negative totals.
#[allow(clippy::too_many_arguments)]
pub fn expected_remaining(
    original: Decimal,
    matched: Decimal,
    transferred_in: Decimal,
    transferred_out: Decimal,
    production_consumed: Decimal,
    adjusted: Decimal,
    vendor_returned: Decimal,
) -> Decimal {
    original - matched + transferred_in - transferred_out - production_consumed + adjusted
        - vendor_returned
}

/// Tolerance below which a stored/expected divergence is treated as noise.
pub fn quantity_epsilon() -> Decimal {
    Decimal::new(1, 4) // 0.0001
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_genesis_kinds_rank_before_consuming_kinds() {
        let genesis = [
            StockEventKind::PurchaseIn,
            StockEventKind::ProductionIn,
            StockEventKind::TransferIn,
        ];
        let consuming = [
            StockEventKind::SaleOut,
            StockEventKind::TransferOut,
            StockEventKind::ProductionOut,
            StockEventKind::Adjustment,
            StockEventKind::VendorReturn,
        ];

        for g in genesis {
            assert!(g.is_genesis());
            for c in consuming {
                assert!(g.priority() < c.priority());
                assert!(!c.is_genesis());
            }
        }
    }

    #[test]
    fn test_production_unit_cost() {
        // 4 units at 100 consumed + 40 extra cost into 40 output units -> 11
        assert_eq!(
            production_unit_cost(dec("400"), dec("40"), dec("40")),
            Some(dec("11"))
        );
        assert_eq!(production_unit_cost(dec("400"), dec("40"), Decimal::ZERO), None);
    }

    #[test]
    fn test_expected_remaining_formula() {
        // original 100, matched 30, in 5, out 20, consumed 10, adjusted -3, returned 2
        let expected = expected_remaining(
            dec("100"),
            dec("30"),
            dec("5"),
            dec("20"),
            dec("10"),
            dec("-3"),
            dec("2"),
        );
        assert_eq!(expected, dec("40"));
    }
}
