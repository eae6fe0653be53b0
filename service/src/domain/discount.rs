//! [`Discount`] definitions.

use std::str::FromStr;

use common::{define_kind, Money, Percent};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Fingerprint;

/// Discount attached to a reservation.
///
/// Stored as an immutable snapshot: identical discounts share one [`Id`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Discount {
    /// [`Value`] of this [`Discount`].
    pub value: Value,

    /// [`Name`] of this [`Discount`].
    pub name: Name,

    /// Promotional [`Code`] of this [`Discount`].
    pub code: Code,

    /// Indicator whether this [`Discount`] is still offered.
    pub is_available: bool,

    /// [`Description`] of this [`Discount`], if any.
    pub description: Option<Description>,
}

impl Discount {
    /// Applies this [`Discount`] to the provided `subtotal`.
    ///
    /// The result never drops below zero.
    #[must_use]
    pub fn apply(&self, subtotal: Money) -> Money {
        match self.value {
            Value::Percentage(p) => subtotal * (Decimal::ONE - p.fraction()),
            Value::Amount(a) => (subtotal - a).clamp_non_negative(),
        }
    }

    /// Calculates the content-addressed [`Id`] of this [`Discount`].
    #[must_use]
    pub fn id(&self) -> Id {
        // WARNING: Avoid changing the order of the fields, because it will
        //          change the IDs of all the already stored discounts.
        let fingerprint = Fingerprint::new("discount")
            .field(self.value.kind().to_string());
        let fingerprint = match self.value {
            Value::Percentage(p) => fingerprint.decimal(p.value()),
            Value::Amount(a) => fingerprint.money(a),
        };
        Id(fingerprint
            .field(&self.name)
            .field(&self.code)
            .field(if self.is_available { "1" } else { "0" })
            .field(self.description.as_ref().map_or("", AsRef::as_ref))
            .finish())
    }
}

/// Value of a [`Discount`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Value {
    /// Share of the subtotal taken off.
    Percentage(Percent),

    /// Fixed amount taken off the subtotal.
    Amount(Money),
}

impl Value {
    /// Returns [`Kind`] of this [`Value`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Percentage(_) => Kind::Percentage,
            Self::Amount(_) => Kind::Amount,
        }
    }
}

define_kind! {
    #[doc = "Kind of a [`Discount`] [`Value`]."]
    enum Kind {
        #[doc = "[`Value::Percentage`]."]
        Percentage = 1,

        #[doc = "[`Value::Amount`]."]
        Amount = 2,
    }
}

/// Content-addressed ID of a [`Discount`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

/// Name of a [`Discount`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 256
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `discount::Name`")
    }
}

/// Promotional code of a [`Discount`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Creates a new [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        !code.is_empty()
            && code.len() <= 64
            && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `discount::Code`")
    }
}

/// Description of a [`Discount`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Description`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.len() <= 2048
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `discount::Description`")
    }
}

#[cfg(test)]
mod spec {
    use common::Money;

    use super::{Code, Discount, Name, Value};

    fn discount(value: Value) -> Discount {
        Discount {
            value,
            name: Name::new("Spring Promo").unwrap(),
            code: Code::new("SPRING-25").unwrap(),
            is_available: true,
            description: None,
        }
    }

    #[test]
    fn applies_percentage() {
        let d = discount(Value::Percentage("25".parse().unwrap()));
        assert_eq!(d.apply(Money::from(2000)), Money::from(1500));
    }

    #[test]
    fn applies_amount_down_to_zero() {
        let d = discount(Value::Amount(Money::from(150)));
        assert_eq!(d.apply(Money::from(1850)), Money::from(1700));
        assert_eq!(d.apply(Money::from(100)), Money::ZERO);
    }

    #[test]
    fn id_is_content_addressed() {
        let a = discount(Value::Amount(Money::from(150)));
        assert_eq!(a.id(), a.clone().id());

        let mut b = a.clone();
        b.is_available = false;
        assert_ne!(a.id(), b.id());

        let c = discount(Value::Percentage("15".parse().unwrap()));
        let d = discount(Value::Amount(Money::from(15)));
        assert_ne!(c.id(), d.id());
    }
}
