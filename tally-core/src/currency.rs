//! BRL currency codec.
//!
//! Three views of one amount:
//! - a display string in pt-BR format (`R$ 1.234,56`)
//! - a keystroke buffer typed by the user, read as cents (`"123456"`)
//! - [`Money`], integer cents
//!
//! Keystrokes and display strings are decoded the same way: every non-digit is
//! dropped and the remaining digits are cents. That makes
//! `parse(format_keystrokes(n)) == n / 100` hold exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

pub const CURRENCY_SYMBOL: &str = "R$";
const DECIMAL_SEPARATOR: char = ',';
const GROUPING_SEPARATOR: char = '.';
const MINOR_PER_MAJOR: u64 = 100;

/// An amount in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(cents: i64) -> Self {
        Self(cents)
    }

    /// Round a decimal amount to the nearest cent, halves away from zero.
    /// Non-finite input is zero.
    pub fn from_amount(amount: f64) -> Self {
        if !amount.is_finite() {
            return Self::ZERO;
        }
        Self((amount * MINOR_PER_MAJOR as f64).round() as i64)
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn to_amount(self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Share of this amount per item, rounded to the cent. Zero when `count` is zero.
    pub fn per(self, count: u64) -> Money {
        if count == 0 {
            return Self::ZERO;
        }
        let n = i128::from(count);
        let cents = i128::from(self.0);
        let share = (cents.abs() * 2 + n) / (2 * n);
        Self((share * cents.signum()) as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{CURRENCY_SYMBOL} {}{DECIMAL_SEPARATOR}{:02}",
            group_thousands(cents / MINOR_PER_MAJOR),
            cents % MINOR_PER_MAJOR
        )
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUPING_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

/// Digits of `raw` read as one integer; everything else is ignored.
/// Saturates instead of overflowing.
fn digits_value(raw: &str) -> i64 {
    raw.chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(d.into()))
}

/// Render an amount as a display string.
pub fn format(amount: f64) -> String {
    Money::from_amount(amount).to_string()
}

/// Render a keystroke buffer: its digits are cents.
pub fn format_keystrokes(raw: &str) -> String {
    Money::from_minor(digits_value(raw)).to_string()
}

/// Decode a display string (or keystroke buffer) to cents. No digits gives zero.
pub fn parse_minor(display: &str) -> Money {
    Money::from_minor(digits_value(display))
}

/// Decode a display string to an amount.
pub fn parse(display: &str) -> f64 {
    parse_minor(display).to_amount()
}
