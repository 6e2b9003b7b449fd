//! Money helpers built on `rust_decimal`.
//!
//! Prices, totals and drawer amounts are `Decimal` end to end, so a total of
//! 10 × 2 + 5 × 1 is exactly 25.00 and reconciliation differences never pick up
//! binary floating point noise.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{Currency, OrderLine};

pub fn order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}

/// Change owed for a cash payment. `received` must cover `total`.
pub fn change_due(received: Decimal, total: Decimal) -> Result<Decimal, ValidationError> {
    if received < total {
        return Err(ValidationError::InsufficientCash { received, total });
    }
    Ok(received - total)
}

pub fn require_non_negative(field: &'static str, amount: Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::NegativeAmount { field, amount });
    }
    Ok(())
}

pub fn currency_symbol(currency: Currency) -> &'static str {
    match currency {
        Currency::Usd => "$",
        Currency::Eur => "€",
        Currency::Brl => "R$",
        Currency::Rub => "₽",
        Currency::Cny => "¥",
    }
}
