//! Validation utilities for the Wholesale Produce Trading Platform

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::Allocation;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a signed adjustment delta (zero is a no-op and rejected)
pub fn validate_nonzero_delta(delta: Decimal) -> Result<(), &'static str> {
    if delta.is_zero() {
        return Err("Delta cannot be zero");
    }
    Ok(())
}

/// Validate a manual allocation request: non-empty, every entry positive,
/// no lot listed twice
pub fn validate_allocations(allocations: &[Allocation]) -> Result<(), &'static str> {
    if allocations.is_empty() {
        return Err("At least one allocation is required");
    }
    for allocation in allocations {
        if allocation.quantity <= Decimal::ZERO {
            return Err("Allocation quantities must be positive");
        }
    }
    let mut ids: Vec<Uuid> = allocations.iter().map(|a| a.lot_id).collect();
    ids.sort();
    ids.dedup();
    if ids.len() != allocations.len() {
        return Err("A lot cannot appear twice in one allocation request");
    }
    Ok(())
}

/// Validate that a transfer crosses warehouses
pub fn validate_distinct_warehouses(source: Uuid, destination: Uuid) -> Result<(), &'static str> {
    if source == destination {
        return Err("Transfer destination must be a different warehouse");
    }
    Ok(())
}

/// Validate a free-text reason field
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("A reason is required");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    if name.len() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(dec("0.5")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_nonzero_delta() {
        assert!(validate_nonzero_delta(dec("-2")).is_ok());
        assert!(validate_nonzero_delta(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_allocations() {
        let lot = Uuid::new_v4();
        assert!(validate_allocations(&[]).is_err());
        assert!(validate_allocations(&[Allocation {
            lot_id: lot,
            quantity: dec("1")
        }])
        .is_ok());
        // duplicate lot
        assert!(validate_allocations(&[
            Allocation {
                lot_id: lot,
                quantity: dec("1")
            },
            Allocation {
                lot_id: lot,
                quantity: dec("2")
            }
        ])
        .is_err());
    }

    #[test]
    fn test_distinct_warehouses() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_distinct_warehouses(a, b).is_ok());
        assert!(validate_distinct_warehouses(a, a).is_err());
    }
}
