//! Japanese yen amounts.
//!
//! The shop only sells in JPY, which has no minor unit. Amounts are stored in
//! `NUMERIC(10,2)` columns but are always whole yen: the payment processor
//! refuses fractional JPY, and each line it receives must add up exactly to
//! the totals recorded on the order.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 code for every amount in the shop.
pub const CURRENCY_CODE: &str = "JPY";

/// Errors from constructing a [`Yen`] amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Negative prices and totals are never valid.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),

    /// JPY has no fractional unit.
    #[error("amount must be whole yen: {0}")]
    Fractional(Decimal),
}

/// A non-negative amount of Japanese yen.
///
/// ```
/// use omoide_core::Yen;
///
/// let price = Yen::from_whole(1_280);
/// assert_eq!(price.to_string(), "¥1,280");
/// assert_eq!(price.times(3), Yen::from_whole(3_840));
/// assert_eq!(price.to_processor_string(), "1280");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Decimal", try_from = "Decimal")]
pub struct Yen(Decimal);

impl Yen {
    /// Zero yen.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount, rejecting negatives and fractions of a yen.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] when `amount < 0` and
    /// [`MoneyError::Fractional`] when it is not a whole number.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        if !amount.fract().is_zero() {
            return Err(MoneyError::Fractional(amount));
        }
        Ok(Self(amount.trunc()))
    }

    /// Create an amount from a whole number of yen.
    #[must_use]
    pub fn from_whole(yen: u32) -> Self {
        Self(Decimal::from(yen))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// This amount multiplied by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// The amount as the processor expects it, without a decimal point.
    #[must_use]
    pub fn to_processor_string(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl Add for Yen {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Yen {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl TryFrom<Decimal> for Yen {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Yen> for Decimal {
    fn from(value: Yen) -> Self {
        value.0
    }
}

impl fmt::Display for Yen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0.normalize().to_string();
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "¥{grouped}")
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Yen {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Yen {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Yen {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Yen::new(Decimal::new(-1, 0)),
            Err(MoneyError::Negative(_))
        ));
        assert!(Yen::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_rejects_fractional_yen() {
        assert_eq!(
            Yen::new(Decimal::new(10_050, 2)),
            Err(MoneyError::Fractional(Decimal::new(10_050, 2)))
        );
        assert!(serde_json::from_str::<Yen>("\"100.5\"").is_err());
        assert_eq!(
            serde_json::from_str::<Yen>("\"100.00\"").unwrap(),
            Yen::from_whole(100)
        );
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Yen::from_whole(0).to_string(), "¥0");
        assert_eq!(Yen::from_whole(500).to_string(), "¥500");
        assert_eq!(Yen::from_whole(1_000).to_string(), "¥1,000");
        assert_eq!(Yen::from_whole(1_234_567).to_string(), "¥1,234,567");
    }

    #[test]
    fn test_processor_string_drops_scale() {
        let amount = Yen::new(Decimal::new(250_000, 2)).unwrap();
        assert_eq!(amount.to_processor_string(), "2500");
    }

    #[test]
    fn test_sum_and_times() {
        let total: Yen = [Yen::from_whole(1_000).times(2), Yen::from_whole(500)]
            .into_iter()
            .sum();
        assert_eq!(total, Yen::from_whole(2_500));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Yen::from_whole(980)).unwrap();
        assert_eq!(json, "\"980\"");
    }
}
