use crate::errors::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits carried by every money field.
pub const MONEY_SCALE: u32 = 2;

/// Round half-up to the minor unit.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Rounds to the minor unit, refusing values too large to carry two
/// fractional digits.
pub fn fit_money(value: Decimal) -> Result<Decimal, LedgerError> {
    let rounded = round_money(value);
    if rounded.scale() != MONEY_SCALE {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(rounded)
}

/// Overflow-checked sum of two money values.
pub fn add_money(a: Decimal, b: Decimal) -> Result<Decimal, LedgerError> {
    a.checked_add(b)
        .ok_or(LedgerError::InvalidAmount)
        .and_then(fit_money)
}

/// Accepts strictly positive amounts expressible in the minor unit.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount);
    }
    fit_money(amount)
}
