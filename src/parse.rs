//! Value parsing for the `<int>.<digit>` reading format.
//!
//! The integer part is accumulated into an `i32` with checked arithmetic, so any
//! integer part up to `i32::MAX` in magnitude is accepted and anything wider is
//! rejected with [`ParseError::Overflow`] rather than wrapping.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// How the fractional digit is combined with the integer part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseStrategy {
    /// `int + digit / 10`.
    #[default]
    Exact,
    /// `int + 10 / digit`, kept bit-for-bit compatible with the fast path of the
    /// original tool. Only `x.0` values come out right.
    FastApproximate,
    /// Any finite decimal notation `f64::from_str` accepts.
    General,
}

impl FromStr for ParseStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(ParseStrategy::Exact),
            "fast" => Ok(ParseStrategy::FastApproximate),
            "general" => Ok(ParseStrategy::General),
            other => Err(format!("unknown parser `{other}` (expected exact, fast or general)")),
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseStrategy::Exact => "exact",
            ParseStrategy::FastApproximate => "fast",
            ParseStrategy::General => "general",
        })
    }
}

/// Parses a reading. Empty input yields `0.0` under every strategy.
pub fn parse_value(raw: &[u8], strategy: ParseStrategy) -> Result<f64, ParseError> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    match strategy {
        ParseStrategy::Exact => parse_fixed(raw).map(|(neg, base, tenth)| {
            let tenths = base as i64 * 10 + tenth as i64;
            let v = tenths as f64 / 10.0;
            if neg { -v } else { v }
        }),
        ParseStrategy::FastApproximate => parse_fixed(raw).map(|(neg, base, tenth)| {
            let mut total = base as f64;
            if tenth != 0 {
                total += 10.0 / tenth as f64;
            }
            if neg { -total } else { total }
        }),
        ParseStrategy::General => std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or(ParseError::NotANumber),
    }
}

/// Splits `[-]<digits>.<digit>` into sign, integer part and fractional digit.
fn parse_fixed(raw: &[u8]) -> Result<(bool, i32, u8), ParseError> {
    let neg = raw[0] == b'-';
    let body = if neg { &raw[1..] } else { raw };

    let dot = body
        .iter()
        .position(|&b| b == b'.')
        .ok_or(ParseError::MissingDecimalPoint)?;
    let (int_part, frac) = body.split_at(dot);

    let tenth = match &frac[1..] {
        [d] if d.is_ascii_digit() => d - b'0',
        _ => return Err(ParseError::BadFraction),
    };

    let mut base = 0i32;
    for &b in int_part {
        if !b.is_ascii_digit() {
            return Err(ParseError::BadDigit(b));
        }
        base = base
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i32))
            .ok_or(ParseError::Overflow)?;
    }
    Ok((neg, base, tenth))
}
