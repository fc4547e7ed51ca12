//! Money calculation using rust_decimal for precision
//!
//! Subtotals and the order total are computed in `Decimal` and converted to
//! `f64` (2 decimal places, half-up) for storage. Client-supplied subtotals
//! and totals are never trusted.

use rust_decimal::prelude::*;

use crate::error::{OrderError, OrderResult};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;

/// Validate one line's price and quantity
pub fn validate_line(index: usize, price: f64, quantity: i32) -> OrderResult<()> {
    let invalid = |reason: String| OrderError::InvalidItem { index, reason };

    if !price.is_finite() {
        return Err(invalid(format!("price must be a finite number, got {price}")));
    }
    if price < 0.0 {
        return Err(invalid(format!("price must be non-negative, got {price}")));
    }
    if price > MAX_PRICE {
        return Err(invalid(format!(
            "price exceeds maximum allowed ({MAX_PRICE}), got {price}"
        )));
    }
    if quantity <= 0 {
        return Err(invalid(format!("quantity must be positive, got {quantity}")));
    }
    if quantity > MAX_QUANTITY {
        return Err(invalid(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"
        )));
    }
    Ok(())
}

/// Non-finite input is logged and treated as zero (validated at the boundary)
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert back to f64 rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// `price * quantity`
pub fn line_subtotal(price: f64, quantity: i32) -> Decimal {
    to_decimal(price) * Decimal::from(quantity)
}

/// Sum of line subtotals
pub fn order_total<I>(lines: I) -> f64
where
    I: IntoIterator<Item = (f64, i32)>,
{
    let total: Decimal = lines
        .into_iter()
        .map(|(price, quantity)| line_subtotal(price, quantity))
        .sum();
    to_f64(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_precision() {
        assert_ne!(0.1_f64 + 0.2_f64, 0.3);
        assert_eq!(to_f64(to_decimal(0.1) + to_decimal(0.2)), 0.3);
    }

    #[test]
    fn test_order_total_is_sum_of_subtotals() {
        assert_eq!(order_total([(10.0, 3)]), 30.0);
        assert_eq!(order_total([(10.99, 3), (0.01, 1000)]), 42.97);
        assert_eq!(order_total(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(to_f64(Decimal::new(125, 3)), 0.13);
        assert_eq!(to_f64(Decimal::new(-125, 3)), -0.13);
        assert_eq!(to_f64(Decimal::new(124, 3)), 0.12);
    }

    #[test]
    fn test_validate_line() {
        assert!(validate_line(0, 10.0, 3).is_ok());
        assert!(validate_line(0, 0.0, 1).is_ok());
        assert!(validate_line(0, -1.0, 1).is_err());
        assert!(validate_line(0, f64::NAN, 1).is_err());
        assert!(validate_line(0, f64::INFINITY, 1).is_err());
        assert!(validate_line(0, 10.0, 0).is_err());
        assert!(validate_line(0, 10.0, -2).is_err());
        assert!(validate_line(0, 10.0, MAX_QUANTITY + 1).is_err());

        match validate_line(4, 1.0, 0) {
            Err(OrderError::InvalidItem { index, .. }) => assert_eq!(index, 4),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
