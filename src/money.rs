//! Fixed-point helpers shared by the normalizer, engine and reports.
//!
//! Crypto quantities carry 8 fractional digits and CAD values carry 2.
//! Everything is rounded half away from zero at the point it is computed.

use num_format::{Locale, ToFormattedString as _};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::{Error, Result};

pub const QUANTITY_PLACES: u32 = 8;
pub const CURRENCY_PLACES: u32 = 2;

pub fn q2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(CURRENCY_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn q8(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(QUANTITY_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a decimal cell, accepting `,` as the fractional separator.
///
/// An empty cell is zero. Anything else that does not parse is an error.
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let cleaned = s.trim().replace(',', ".");
    if cleaned.is_empty() {
        return Ok(dec!(0));
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| Error::InvalidDecimal(s.to_string()))
}

/// Lenient variant for dirty exports: returns zero on failure together with
/// `false` so the caller can record that a substitution happened.
pub fn parse_decimal_or_zero(s: &str) -> (Decimal, bool) {
    match parse_decimal(s) {
        Ok(d) => (d, true),
        Err(_) => (dec!(0), false),
    }
}

/// Renders a CAD amount as `$ 1,234.56`, or `–$ 1,234.56` when negative.
pub fn format_cad(x: Decimal) -> String {
    let v = q2(x);
    let prefix = if v.is_sign_negative() && !v.is_zero() {
        "–$ "
    } else {
        "$ "
    };
    let abs = v.abs();
    let whole = abs.trunc().to_u128().unwrap_or_default();
    let cents = (abs.fract() * dec!(100)).to_u32().unwrap_or_default();
    format!(
        "{}{}.{:02}",
        prefix,
        whole.to_formatted_string(&Locale::en),
        cents
    )
}
