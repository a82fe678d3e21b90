use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Money is held as an exact decimal so sums never drift, whatever the
/// number of fractional digits the user typed.
pub type Amount = Decimal;

/// Largest amount a single expense may carry.
pub const MAX_EXPENSE_AMOUNT: Amount = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// [`MAX_EXPENSE_AMOUNT`] as a float, for checking raw input.
pub const MAX_EXPENSE_UNITS: f64 = 1_000_000.0;

/// Convert an untrusted float into an exact amount.
///
/// The float is read back through its shortest decimal representation, so
/// `1.005` becomes exactly `1.005` and not the nearest binary fraction.
/// Returns `None` for non-finite input or values a [`Decimal`] cannot hold.
pub fn amount_from_f64(value: f64) -> Option<Amount> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// Convert an amount back into a float, for forms and charts.
pub fn amount_to_f64(amount: Amount) -> f64 {
    amount.to_f64().unwrap_or(f64::NAN)
}

/// Format an amount with at least two decimal places.
/// Example: 50 -> "50.00", 12.5 -> "12.50", 1.005 -> "1.005"
pub fn format_amount(amount: Amount) -> String {
    let mut shown = amount.normalize();
    if shown.scale() < 2 {
        shown.rescale(2);
    }
    shown.to_string()
}
