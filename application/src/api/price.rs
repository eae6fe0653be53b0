//! [`Price`]-related definitions.

use common::Money;
use derive_more::From;
use juniper::graphql_object;
use service::pricing;

use crate::{api::reservation::RateSnapshot, Context};

/// Quoted price of a reservation.
#[derive(Clone, Copy, Debug, From)]
pub struct Price(pricing::Price);

/// Quoted price of a reservation.
#[graphql_object(context = Context)]
impl Price {
    /// Total price, rounded to cents.
    #[must_use]
    pub fn total(&self) -> Money {
        self.0.total
    }

    /// Total cost of the requested add-ons.
    #[must_use]
    pub fn add_ons_total_cost(&self) -> Money {
        self.0.add_ons_total_cost
    }

    /// Rates the `total` is computed with.
    #[must_use]
    pub fn rates(&self) -> RateSnapshot {
        self.0.rates.into()
    }

    /// Itemized breakdown of the `total`.
    #[must_use]
    pub fn breakdown(&self) -> Breakdown {
        Breakdown(self.0.breakdown)
    }
}

/// Itemized breakdown of a [`Price`].
#[derive(Clone, Copy, Debug)]
pub struct Breakdown(pricing::Breakdown);

/// Itemized breakdown of a `Price`.
#[graphql_object(name = "PriceBreakdown", context = Context)]
impl Breakdown {
    /// Cost of the booked seats.
    #[must_use]
    pub fn seats(&self) -> Money {
        self.0.seats
    }

    /// Cost of the requested add-ons.
    #[must_use]
    pub fn add_ons(&self) -> Money {
        self.0.add_ons
    }

    /// Facility fee of the event day.
    #[must_use]
    pub fn facility(&self) -> Money {
        self.0.facility
    }

    /// Cleaning fee.
    #[must_use]
    pub fn cleaning(&self) -> Money {
        self.0.cleaning
    }

    /// Number of whole overtime hours.
    #[must_use]
    pub fn overtime_hours(&self) -> i32 {
        i32::try_from(self.0.overtime_hours).unwrap_or(i32::MAX)
    }

    /// Cost of the overtime.
    #[must_use]
    pub fn overtime(&self) -> Money {
        self.0.overtime
    }

    /// Sum of all the items above.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.0.subtotal
    }

    /// Subtotal after the discount.
    #[must_use]
    pub fn discounted(&self) -> Money {
        self.0.discounted
    }
}
