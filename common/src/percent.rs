//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Percentage in the `0..=100` range.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "Decimal", into = "Decimal")
)]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a new [`Percent`] if the provided `value` lies within the
    /// `0..=100` range.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE_HUNDRED)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Returns the raw value of this [`Percent`] (e.g. `15` for `15%`).
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Returns this [`Percent`] as a fraction of one (e.g. `0.15` for `15%`).
    #[must_use]
    pub fn fraction(self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = &'static str;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("percent out of `0..=100` range")
    }
}

impl From<Percent> for Decimal {
    fn from(p: Percent) -> Self {
        p.0
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim().trim_end_matches('%'))
            .map_err(|_| "invalid percent value")?
            .try_into()
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Percentage in the `0..=100` range, as a decimal string
    /// (e.g. `"12.5"`).
    #[graphql_scalar(with = Self, parse_token(String))]
    type Percent = super::Percent;

    impl Percent {
        fn to_output<S: ScalarValue>(p: &Percent) -> Value<S> {
            Value::scalar(p.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Percent` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Percent` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Percent;

    #[test]
    fn bounded() {
        assert!(Percent::new(Decimal::ZERO).is_some());
        assert!(Percent::new(Decimal::ONE_HUNDRED).is_some());
        assert!(Percent::new(Decimal::new(-1, 1)).is_none());
        assert!(Percent::new(Decimal::new(1001, 1)).is_none());
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Percent::from_str("12.5").unwrap().value(),
            Decimal::new(125, 1),
        );
        assert_eq!(
            Percent::from_str("10%").unwrap().value(),
            Decimal::from(10),
        );
        assert!(Percent::from_str("101").is_err());
        assert!(Percent::from_str("ten").is_err());
    }

    #[test]
    fn fraction() {
        let p = Percent::from_str("15").unwrap();
        assert_eq!(p.fraction(), Decimal::new(15, 2));
    }
}
