//! Decimal rounding helpers shared by the pricing families.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for prices computed by stop, trail and breakout logic.
pub const PRICE_DP: u32 = 2;

/// Decimal places for percent returns.
pub const PERCENT_DP: u32 = 6;

/// Round a computed price to 2 dp, half-to-even.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointNearestEven)
}

pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointNearestEven)
}

/// Half of `lots`, rounded up to a whole lot.
pub fn half_lots(lots: Decimal) -> Decimal {
    (lots / Decimal::TWO).ceil()
}

/// +1 for a long entry, -1 for a short one.
pub fn direction_sign(is_long: bool) -> Decimal {
    if is_long { Decimal::ONE } else { Decimal::NEGATIVE_ONE }
}
