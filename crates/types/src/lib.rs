//! Validated value types shared across the denials workspace.
//!
//! Every type here checks its invariant on construction, including when deserialised, so code
//! holding one never needs to re-check it:
//! - [`NonEmptyText`]: trimmed, at least one non-whitespace character
//! - [`Percentage`]: finite and within `[0, 100]`
//! - [`Money`]: a non-negative amount held as whole cents

use std::iter::Sum;
use std::ops::Add;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors raised when a numeric value falls outside its permitted range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("percentage must be within 0..=100, got {0}")]
    Percentage(f64),
    #[error("amount must be a finite, non-negative number, got {0}")]
    Money(f64),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// PERCENTAGE
// ============================================================================

/// A percentage in the closed range `[0, 100]`.
///
/// Used for rule success rates, correction confidence and appeal probability.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.0);
    pub const FULL: Percentage = Percentage(100.0);

    /// Creates a percentage, rejecting values outside `[0, 100]` and non-finite values.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Percentage` if `value` is out of range or NaN.
    pub fn new(value: f64) -> Result<Self, RangeError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(RangeError::Percentage(value));
        }
        Ok(Self(value))
    }

    /// Creates a percentage by clamping `value` into `[min, max]`.
    ///
    /// `min` and `max` are themselves clamped into `[0, 100]`. NaN clamps to `min`.
    pub fn clamped_between(value: f64, min: f64, max: f64) -> Self {
        let lo = min.clamp(0.0, 100.0);
        let hi = max.clamp(lo, 100.0);
        if value.is_nan() {
            return Self(lo);
        }
        Self(value.clamp(lo, hi))
    }

    /// Creates a percentage by clamping `value` into `[0, 100]`.
    pub fn clamped(value: f64) -> Self {
        Self::clamped_between(value, 0.0, 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// The percentage as a fraction in `[0, 1]`.
    pub fn as_fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl serde::Serialize for Percentage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Percentage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = f64::deserialize(deserializer)?;
        Percentage::new(v).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// MONEY
// ============================================================================

/// A non-negative monetary amount stored as whole cents.
///
/// Serialises as an integer number of cents so that sums over many records are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Converts a dollar amount to cents, rounding to the nearest cent.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Money` for negative or non-finite amounts.
    pub fn from_dollars(dollars: f64) -> Result<Self, RangeError> {
        if !dollars.is_finite() || dollars < 0.0 {
            return Err(RangeError::Money(dollars));
        }
        Ok(Self((dollars * 100.0).round() as u64))
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Scales the amount by a percentage, rounding to the nearest cent.
    pub fn scaled(self, pct: Percentage) -> Self {
        Self((self.0 as f64 * pct.as_fraction()).round() as u64)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl serde::Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Money)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  CO-97  ").expect("should accept padded text");
        assert_eq!(text.as_str(), "CO-97");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        let err = NonEmptyText::new("   ").expect_err("whitespace should be rejected");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialise_rejects_empty() {
        let res: Result<NonEmptyText, _> = serde_json::from_str("\"\"");
        assert!(res.is_err(), "empty string should fail to deserialise");
    }

    #[test]
    fn test_percentage_rejects_out_of_range() {
        assert!(Percentage::new(-0.1).is_err());
        assert!(Percentage::new(100.1).is_err());
        assert!(Percentage::new(f64::NAN).is_err());
        assert_eq!(Percentage::new(85.0).unwrap().value(), 85.0);
    }

    #[test]
    fn test_percentage_clamped_between_bounds() {
        assert_eq!(Percentage::clamped_between(120.0, 10.0, 95.0).value(), 95.0);
        assert_eq!(Percentage::clamped_between(2.0, 10.0, 95.0).value(), 10.0);
        assert_eq!(Percentage::clamped_between(f64::NAN, 10.0, 95.0).value(), 10.0);
    }

    #[test]
    fn test_percentage_deserialise_validates() {
        let ok: Percentage = serde_json::from_str("72.5").unwrap();
        assert_eq!(ok.value(), 72.5);
        assert!(serde_json::from_str::<Percentage>("150").is_err());
    }

    #[test]
    fn test_money_from_dollars_rounds_to_cents() {
        assert_eq!(Money::from_dollars(12.345).unwrap().cents(), 1235);
        assert!(Money::from_dollars(-1.0).is_err());
    }

    #[test]
    fn test_money_sum_and_display() {
        let total: Money = [Money::from_cents(150), Money::from_cents(1999)]
            .iter()
            .sum();
        assert_eq!(total, Money::from_cents(2149));
        assert_eq!(total.to_string(), "$21.49");
    }

    #[test]
    fn test_money_scaled_by_percentage() {
        let value = Money::from_cents(60_000);
        let pct = Percentage::new(85.0).unwrap();
        assert_eq!(value.scaled(pct), Money::from_cents(51_000));
    }

    #[test]
    fn test_money_rejects_negative_json() {
        assert!(serde_json::from_str::<Money>("-5").is_err());
        assert_eq!(serde_json::from_str::<Money>("500").unwrap().cents(), 500);
    }
}
