//! Lot status projection and weight proration math

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock status of a purchase lot.
///
/// `Available` and `Depleted` are a cached projection of
/// `remaining_quantity`; `Cancelled` is terminal and never recomputed from
/// quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Available,
    Depleted,
    Cancelled,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Available => "available",
            LotStatus::Depleted => "depleted",
            LotStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(LotStatus::Available),
            "depleted" => Some(LotStatus::Depleted),
            "cancelled" => Some(LotStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status projection for a remaining quantity: positive stock is available,
/// zero or negative stock is depleted.
pub fn status_for_quantity(remaining: Decimal) -> LotStatus {
    if remaining > Decimal::ZERO {
        LotStatus::Available
    } else {
        LotStatus::Depleted
    }
}

/// Weight carried by `quantity` units of a lot whose remaining stock
/// currently weighs `total_weight`.
///
/// The per-unit weight of a lot is `total_weight / remaining_quantity`; both
/// fields move together on every mutation, so the ratio is stable across the
/// lot's lifetime.
pub fn prorated_weight(
    total_weight: Decimal,
    remaining_quantity: Decimal,
    quantity: Decimal,
) -> Decimal {
    if remaining_quantity.is_zero() {
        Decimal::ZERO
    } else {
        total_weight * quantity / remaining_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_status_projection() {
        assert_eq!(status_for_quantity(dec("0.1")), LotStatus::Available);
        assert_eq!(status_for_quantity(Decimal::ZERO), LotStatus::Depleted);
        assert_eq!(status_for_quantity(dec("-3")), LotStatus::Depleted);
    }

    #[test]
    fn test_prorated_weight_full_amount() {
        // Moving the entire remaining quantity moves the entire weight.
        assert_eq!(dec("180.0"), prorated_weight(dec("180.0"), dec("90"), dec("90")));
    }

    #[test]
    fn test_prorated_weight_partial() {
        // 100 units weighing 250kg: 40 units carry 100kg.
        assert_eq!(dec("100"), prorated_weight(dec("250"), dec("100"), dec("40")));
    }

    #[test]
    fn test_prorated_weight_zero_remaining() {
        assert_eq!(Decimal::ZERO, prorated_weight(dec("10"), Decimal::ZERO, dec("5")));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [LotStatus::Available, LotStatus::Depleted, LotStatus::Cancelled] {
            assert_eq!(LotStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LotStatus::from_str("sold"), None);
    }
}
