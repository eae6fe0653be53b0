//! Domain definitions.

pub mod add_on;
pub mod discount;
pub mod invoice;
pub mod notification;
pub mod rate;
pub mod receipt;
pub mod reservation;
pub mod user;

use common::Money;
use rust_decimal::Decimal;
use uuid::Uuid;
use xxhash_rust::xxh3::Xxh3;

pub use self::{
    add_on::AddOn,
    discount::Discount,
    invoice::Invoice,
    notification::Notification,
    receipt::{Payment, Receipt},
    reservation::Reservation,
    user::User,
};

/// Builder of a content-addressed [`Uuid`] out of canonical field values.
struct Fingerprint(Xxh3);

impl Fingerprint {
    /// Starts a new [`Fingerprint`] of the provided entity `kind`.
    fn new(kind: &str) -> Self {
        Self(Xxh3::new()).field(kind)
    }

    /// Adds the provided textual field.
    ///
    /// Every field is length-prefixed, so adjacent fields never blend.
    fn field(mut self, value: impl AsRef<str>) -> Self {
        let bytes = value.as_ref().as_bytes();
        self.0.update(&(bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    /// Adds the provided [`Decimal`] field in its normalized form, so
    /// `2.5` and `2.50` produce the same [`Fingerprint`].
    fn decimal(self, value: Decimal) -> Self {
        self.field(value.normalize().to_string())
    }

    /// Adds the provided [`Money`] field.
    fn money(self, value: Money) -> Self {
        self.decimal(value.amount())
    }

    /// Finishes this [`Fingerprint`].
    fn finish(self) -> Uuid {
        Uuid::from_u128(self.0.digest128())
    }
}
