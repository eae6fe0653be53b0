//! Price computation of a [`Reservation`].
//!
//! Everything here is pure: the same inputs always produce the same
//! [`Price`].
//!
//! [`Reservation`]: crate::domain::Reservation

use std::collections::HashMap;

use common::{datetime::Weekday, Money};
use derive_more::{Display, Error as StdError};
use rust_decimal::Decimal;

use crate::domain::{
    add_on, rate,
    reservation::{
        EffectiveEndDateTime, EndDateTime, RequestedAddOn, SeatCount,
        StartDateTime, TaxRate,
    },
    AddOn, Discount,
};

/// Hour of the next day the overtime starts at.
pub const OVERTIME_FROM_HOUR: u8 = 3;

/// Inputs of a [`Price`] computation.
#[derive(Clone, Debug)]
pub struct Input {
    /// Start of the event.
    pub starts_at: StartDateTime,

    /// Scheduled end of the event.
    pub ends_at: EndDateTime,

    /// Actual end of the event, if known.
    pub effectively_ends_at: Option<EffectiveEndDateTime>,

    /// Number of booked seats.
    pub seats: SeatCount,

    /// Requested catalog add-ons.
    pub add_ons: Vec<RequestedAddOn>,

    /// Applied [`Discount`], if any.
    pub discount: Option<Discount>,

    /// Applied [`TaxRate`], if any.
    pub tax_rate: Option<TaxRate>,
}

/// Computed price of a reservation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Price {
    /// Total price, rounded to cents.
    pub total: Money,

    /// Total cost of all the requested add-ons.
    pub add_ons_total_cost: Money,

    /// Rates the [`Price`] was computed with.
    pub rates: rate::Snapshot,

    /// Itemized [`Breakdown`] of the [`Price`].
    pub breakdown: Breakdown,
}

/// Itemized breakdown of a [`Price`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Breakdown {
    /// Cost of the booked seats.
    pub seats: Money,

    /// Cost of the requested add-ons.
    pub add_ons: Money,

    /// Facility fee of the event day.
    pub facility: Money,

    /// Cleaning fee.
    pub cleaning: Money,

    /// Number of whole overtime hours.
    pub overtime_hours: u32,

    /// Cost of the overtime.
    pub overtime: Money,

    /// Sum of all the items above.
    pub subtotal: Money,

    /// Subtotal after the discount.
    pub discounted: Money,
}

/// Error of computing a [`Price`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Requested [`AddOn`] is absent in the catalog.
    #[display("`AddOn(id: {_0})` does not exist")]
    AddOnNotExists(#[error(not(source))] add_on::Id),
}

/// Computes the [`Price`] of the provided [`Input`] using the resolved rate
/// [`rate::Table`] and the `catalog` of requested [`AddOn`]s.
///
/// # Errors
///
/// If any of requested [`AddOn`]s is absent in the `catalog`.
pub fn compute(
    input: &Input,
    rates: &rate::Table,
    catalog: &HashMap<add_on::Id, AddOn>,
) -> Result<Price, Error> {
    let seats = u32::from(input.seats.get());

    let seats_cost = rates.seat * Decimal::from(seats);

    let add_ons_cost = input
        .add_ons
        .iter()
        .map(|r| {
            catalog
                .get(&r.add_on_id)
                .map(|a| a.price * Decimal::from(r.quantity))
                .ok_or(Error::AddOnNotExists(r.add_on_id))
        })
        .sum::<Result<Money, _>>()?;

    let facility = if input.starts_at.coerce::<()>().weekday() == Weekday::Saturday
    {
        rates.saturday_facility
    } else {
        rates.regular_facility
    };

    let cleaning = if seats > 0
        && seats <= u32::from(rate::Table::SMALL_GUEST_LIMIT)
    {
        rates.small_guest_cleaning
    } else {
        rates.large_guest_cleaning
    };

    let overtime_hours = overtime_hours(
        input.starts_at,
        input.ends_at,
        input.effectively_ends_at,
    );
    let overtime_cost = rates.overtime * Decimal::from(overtime_hours);

    let subtotal =
        seats_cost + add_ons_cost + facility + cleaning + overtime_cost;

    let discounted = input
        .discount
        .as_ref()
        .map_or(subtotal, |d| d.apply(subtotal));

    let total = input
        .tax_rate
        .map_or(discounted, |t| discounted * (Decimal::ONE + t.fraction()))
        .round_cents();

    Ok(Price {
        total,
        add_ons_total_cost: add_ons_cost,
        rates: rate::Snapshot {
            seat: rates.seat,
            facility,
            overtime: rates.overtime,
            cleaning,
        },
        breakdown: Breakdown {
            seats: seats_cost,
            add_ons: add_ons_cost,
            facility,
            cleaning,
            overtime_hours,
            overtime: overtime_cost,
            subtotal,
            discounted,
        },
    })
}

/// Counts the whole overtime hours of an event.
///
/// Overtime starts at [`OVERTIME_FROM_HOUR`] of the day after the event
/// starts. The actual end counts only once it's known and later than the
/// scheduled one.
#[must_use]
pub fn overtime_hours(
    starts_at: StartDateTime,
    ends_at: EndDateTime,
    effectively_ends_at: Option<EffectiveEndDateTime>,
) -> u32 {
    let Some(overtime_from) = starts_at.next_day_at(OVERTIME_FROM_HOUR) else {
        return 0;
    };
    let overtime_from = overtime_from.coerce::<()>();
    let ends_at = ends_at.coerce::<()>();

    let until = match effectively_ends_at.map(|e| e.coerce::<()>()) {
        Some(e) if e > ends_at && e > overtime_from => e,
        Some(_) => return 0,
        None if ends_at > overtime_from => ends_at,
        None => return 0,
    };

    u32::try_from(until.whole_hours_since(overtime_from)).unwrap_or(0)
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::{DateTime, Money};

    use super::{compute, overtime_hours, Error, Input, Price};
    use crate::domain::{
        add_on, discount, rate,
        reservation::{RequestedAddOn, SeatCount},
        AddOn, Discount,
    };

    fn at(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    fn input(starts_at: &str, ends_at: &str, seats: u16) -> Input {
        Input {
            starts_at: at(starts_at).coerce(),
            ends_at: at(ends_at).coerce(),
            effectively_ends_at: None,
            seats: SeatCount::new(seats).unwrap(),
            add_ons: vec![],
            discount: None,
            tax_rate: Some("0.08".parse().unwrap()),
        }
    }

    fn price(input: &Input) -> Price {
        compute(input, &rate::Table::default(), &HashMap::new()).unwrap()
    }

    #[test]
    fn monday_reservation() {
        // 2099-06-01 is a Monday.
        let p = price(&input(
            "2099-06-01, 06:00 PM",
            "2099-06-01, 11:00 PM",
            80,
        ));

        assert_eq!(p.breakdown.seats, Money::from(200));
        assert_eq!(p.breakdown.facility, Money::from(1500));
        assert_eq!(p.breakdown.cleaning, Money::from(150));
        assert_eq!(p.breakdown.overtime_hours, 0);
        assert_eq!(p.breakdown.subtotal, Money::from(1850));
        assert_eq!(p.total, Money::from(1998));
        assert_eq!(p.total.to_string(), "1998.00");
        assert_eq!(p.rates.facility, Money::from(1500));
        assert_eq!(p.rates.cleaning, Money::from(150));
    }

    #[test]
    fn saturday_reservation() {
        // 2099-06-06 is a Saturday.
        let p = price(&input(
            "2099-06-06, 06:00 PM",
            "2099-06-06, 11:00 PM",
            80,
        ));

        assert_eq!(p.breakdown.subtotal, Money::from(2350));
        assert_eq!(p.total, Money::from(2538));
        assert_eq!(p.rates.facility, Money::from(2000));
    }

    #[test]
    fn is_deterministic() {
        let i = input("2099-06-06, 06:00 PM", "2099-06-07, 05:30 AM", 150);
        let first = price(&i);
        for _ in 0..3 {
            assert_eq!(price(&i), first);
        }
    }

    #[test]
    fn cleaning_depends_on_seats() {
        let small =
            price(&input("2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM", 100));
        assert_eq!(small.breakdown.cleaning, Money::from(150));

        let large =
            price(&input("2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM", 101));
        assert_eq!(large.breakdown.cleaning, Money::from(250));

        let empty =
            price(&input("2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM", 0));
        assert_eq!(empty.breakdown.seats, Money::ZERO);
        assert_eq!(empty.breakdown.cleaning, Money::from(250));
    }

    #[test]
    fn counts_overtime() {
        let start = at("2099-06-01, 06:00 PM").coerce();

        // Ends before 3 AM of the next day.
        assert_eq!(
            overtime_hours(start, at("2099-06-02, 02:00 AM").coerce(), None),
            0,
        );
        // Whole hours only.
        assert_eq!(
            overtime_hours(start, at("2099-06-02, 05:30 AM").coerce(), None),
            2,
        );
        // Actual end later than the scheduled one counts.
        assert_eq!(
            overtime_hours(
                start,
                at("2099-06-02, 04:00 AM").coerce(),
                Some(at("2099-06-02, 07:00 AM").coerce()),
            ),
            4,
        );
        // Actual end earlier than the scheduled one means no overtime.
        assert_eq!(
            overtime_hours(
                start,
                at("2099-06-02, 06:00 AM").coerce(),
                Some(at("2099-06-02, 05:00 AM").coerce()),
            ),
            0,
        );

        let mut i = input("2099-06-01, 06:00 PM", "2099-06-02, 05:00 AM", 80);
        i.tax_rate = None;
        let p = price(&i);
        assert_eq!(p.breakdown.overtime, Money::from(1000));
        assert_eq!(p.total, Money::from(2850));
    }

    #[test]
    fn adds_add_ons() {
        let catalog = HashMap::from([
            (
                add_on::Id::from(1),
                AddOn {
                    id: add_on::Id::from(1),
                    name: add_on::Name::new("Chair Covers").unwrap(),
                    price: "1.5".parse().unwrap(),
                },
            ),
            (
                add_on::Id::from(2),
                AddOn {
                    id: add_on::Id::from(2),
                    name: add_on::Name::new("DJ").unwrap(),
                    price: Money::from(300),
                },
            ),
        ]);
        let mut i = input("2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM", 80);
        i.tax_rate = None;
        i.add_ons = vec![
            RequestedAddOn {
                add_on_id: add_on::Id::from(1),
                quantity: 80,
            },
            RequestedAddOn {
                add_on_id: add_on::Id::from(2),
                quantity: 1,
            },
        ];

        let p = compute(&i, &rate::Table::default(), &catalog).unwrap();
        assert_eq!(p.add_ons_total_cost, Money::from(420));
        assert_eq!(p.total, Money::from(2270));

        i.add_ons.push(RequestedAddOn {
            add_on_id: add_on::Id::from(3),
            quantity: 1,
        });
        let err = compute(&i, &rate::Table::default(), &catalog).unwrap_err();
        assert!(
            matches!(err, Error::AddOnNotExists(id) if id == add_on::Id::from(3)),
            "{err}",
        );
        assert_eq!(err.to_string(), "`AddOn(id: 3)` does not exist");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn applies_discount_before_tax() {
        let mut i = input("2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM", 80);
        i.discount = Some(Discount {
            value: discount::Value::Amount(Money::from(850)),
            name: discount::Name::new("Loyalty").unwrap(),
            code: discount::Code::new("LOYAL").unwrap(),
            is_available: true,
            description: None,
        });

        let p = price(&i);
        assert_eq!(p.breakdown.discounted, Money::from(1000));
        assert_eq!(p.total, Money::from(1080));

        i.discount = Some(Discount {
            value: discount::Value::Percentage("10".parse().unwrap()),
            ..i.discount.unwrap()
        });
        let p = price(&i);
        assert_eq!(p.breakdown.discounted, Money::from(1665));
        assert_eq!(p.total, "1798.20".parse().unwrap());
    }
}
