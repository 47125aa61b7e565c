use crate::error::{Result, TypesError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const HMT_DECIMALS: u32 = 18;
pub const HMT_BASE_UNIT: u128 = 1_000_000_000_000_000_000; // 10^18

/// An HMT token amount held in the token's smallest unit.
///
/// Conversion from human decimal form goes through `rust_decimal` and
/// integer arithmetic only; no floating point is involved anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct HmtAmount(u128);

impl HmtAmount {
    pub const ZERO: Self = Self(0);

    pub fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Whole tokens, e.g. `from_hmt(100)` is `100 * 10^18` base units.
    pub fn from_hmt(hmt: u64) -> Self {
        Self(hmt as u128 * HMT_BASE_UNIT)
    }

    /// Convert a human decimal amount (`"20.5"`) into base units.
    ///
    /// Digits beyond the 18th decimal place are truncated toward zero.
    pub fn from_decimal(amount: Decimal) -> Result<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(TypesError::InvalidAmount(format!(
                "negative amount {}",
                amount
            )));
        }

        let mantissa = amount.mantissa().unsigned_abs();
        let scale = amount.scale();

        let units = if scale <= HMT_DECIMALS {
            mantissa
                .checked_mul(10u128.pow(HMT_DECIMALS - scale))
                .ok_or_else(|| TypesError::InvalidAmount(format!("{} overflows", amount)))?
        } else {
            mantissa / 10u128.pow(scale - HMT_DECIMALS)
        };

        Ok(Self(units))
    }

    /// Back to human decimal form; `None` if the value exceeds the 96-bit
    /// mantissa of `Decimal`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let units = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(units, HMT_DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }

    pub fn to_base_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `pct` percent of this amount, rounded down.
    pub fn percent(&self, pct: u8) -> Self {
        Self(self.0 / 100 * pct as u128 + self.0 % 100 * pct as u128 / 100)
    }

    /// Sum a list of amounts, `None` on overflow.
    pub fn checked_sum<'a, I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a HmtAmount>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, a| acc.checked_add(*a))
    }
}

impl FromStr for HmtAmount {
    type Err = TypesError;

    /// Parse a human decimal amount.
    fn from_str(s: &str) -> Result<Self> {
        let amount = Decimal::from_str(s.trim())
            .map_err(|e| TypesError::InvalidAmount(format!("{:?}: {}", s, e)))?;
        Self::from_decimal(amount)
    }
}

impl fmt::Display for HmtAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / HMT_BASE_UNIT;
        let frac = self.0 % HMT_BASE_UNIT;
        if frac == 0 {
            write!(f, "{} HMT", whole)
        } else {
            let digits = format!("{:018}", frac);
            write!(f, "{}.{} HMT", whole, digits.trim_end_matches('0'))
        }
    }
}
