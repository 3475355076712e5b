use std::fmt;

use crate::Currency;

/// Signed amount in **minor units** paired with the budget currency.
///
/// Use this only at the presentation edge: every computation in the engine
/// works on plain `i64` minor units, as received from the server.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// assert_eq!(Money::new(-1234, Currency::Eur).to_string(), "-12.34 EUR");
/// assert_eq!(Money::new(1234, Currency::Jpy).to_string(), "1234 JPY");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let digits = u32::from(self.currency.minor_units());
        if digits == 0 {
            return write!(f, "{sign}{abs} {}", self.currency);
        }
        let scale = 10u64.pow(digits);
        let major = abs / scale;
        let fraction = abs % scale;
        write!(
            f,
            "{sign}{major}.{fraction:0width$} {}",
            self.currency,
            width = digits as usize
        )
    }
}
