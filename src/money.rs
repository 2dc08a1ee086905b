use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount half-up to 2 decimal places.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a stored JSON number into a Decimal. Stored values were validated
/// on the way in, so an unrepresentable one degrades to zero.
pub fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Fallible conversion for caller-supplied amounts. None for NaN, infinity
/// and magnitudes beyond Decimal's range.
pub fn try_dec(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
}

/// Expose a Decimal as the rounded f64 that gets stored in the document.
pub fn to_f64(amount: Decimal) -> f64 {
    round_money(amount).to_f64().unwrap_or_default()
}

/// Percentage of part over total, zero when the denominator is zero.
pub fn percentage(part: Decimal, total: Decimal, dp: u32) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (part / total * Decimal::from(100))
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Format a money amount with two decimal places and thousands separators
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let (whole, frac) = rounded.split_once('.').unwrap_or((&rounded, "00"));

    let negative = whole.starts_with('-');
    let digits = if negative { &whole[1..] } else { whole };
    let grouped = group_digits(digits);

    if negative {
        format!("-{}.{}", grouped, frac)
    } else {
        format!("{}.{}", grouped, frac)
    }
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
