//! [`Payment`] definitions.

use std::str::FromStr;

use common::{define_kind, Money};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

use super::Id as ReceiptId;
#[cfg(doc)]
use super::Receipt;

/// Single payment made within a [`Receipt`] session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payment {
    /// ID of this [`Payment`].
    pub id: Id,

    /// ID of the [`Receipt`] owning this [`Payment`].
    pub receipt_id: ReceiptId,

    /// [`Method`] of this [`Payment`].
    pub method: Method,

    /// Paid amount.
    pub amount: Money,

    /// Last four digits of the paying card, if paid by card.
    pub card_last_four: Option<CardLastFour>,

    /// Free-form [`Details`] of any other payment method.
    pub other_details: Option<Details>,
}

/// ID of a [`Payment`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    derive_more::FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(i64);

define_kind! {
    #[doc = "Method of a [`Payment`]."]
    enum Method {
        #[doc = "Debit or credit card."]
        Card = 1,

        #[doc = "Cash."]
        Cash = 2,

        #[doc = "Cash App transfer."]
        CashApp = 3,

        #[doc = "Paper check."]
        Check = 4,

        #[doc = "Zelle transfer."]
        Zelle = 5,

        #[doc = "Any other method, see [`Payment::other_details`]."]
        Other = 6,
    }
}

/// Last four digits of a card.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CardLastFour(String);

impl CardLastFour {
    /// Creates a new [`CardLastFour`] if the given `digits` are exactly four
    /// ASCII digits.
    #[must_use]
    pub fn new(digits: impl Into<String>) -> Option<Self> {
        let digits = digits.into();
        (digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()))
            .then_some(Self(digits))
    }
}

impl FromStr for CardLastFour {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CardLastFour`")
    }
}

/// Free-form details of a [`Payment`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Details(String);

impl Details {
    /// Creates new [`Details`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 1024).then_some(Self(text))
    }
}

impl FromStr for Details {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid payment `Details`")
    }
}
