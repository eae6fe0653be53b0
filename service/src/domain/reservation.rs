//! [`Reservation`] definitions.

use std::{str::FromStr, time::Duration};

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, Error, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use super::{add_on, rate, user, Discount};

/// Booking of the venue for a single event.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the [`User`] this [`Reservation`] is made for.
    ///
    /// [`User`]: super::User
    pub user_id: user::Id,

    /// [`DateTime`] when the event starts.
    pub starts_at: StartDateTime,

    /// [`DateTime`] when the event is scheduled to end.
    pub ends_at: EndDateTime,

    /// [`DateTime`] when the event actually ended, if known.
    ///
    /// May exceed the scheduled [`Reservation::ends_at`].
    pub effectively_ends_at: Option<EffectiveEndDateTime>,

    /// Number of booked seats.
    pub seats: SeatCount,

    /// [`EventType`] of the event.
    pub event_type: EventType,

    /// Indicator whether the full package is booked.
    pub is_full_package: bool,

    /// [`RequestedAddOn`]s of this [`Reservation`], in the requested order.
    pub add_ons: Vec<RequestedAddOn>,

    /// Total cost of all the [`Reservation::add_ons`].
    pub add_ons_total_cost: Money,

    /// [`Status`] of this [`Reservation`].
    pub status: Status,

    /// Indicator whether the security deposit was refunded.
    pub is_security_deposit_refunded: bool,

    /// [`TaxRate`] applied to the discounted subtotal, if any.
    pub tax_rate: Option<TaxRate>,

    /// Total price, always computed from the other fields.
    pub total_price: Money,

    /// Rates the [`Reservation::total_price`] was computed with.
    pub rates: rate::Snapshot,

    /// [`Discount`] applied to this [`Reservation`], if any.
    pub discount: Option<Discount>,

    /// [`PriceComputationMethod`] of this [`Reservation`].
    pub price_computation_method: PriceComputationMethod,
}

impl Reservation {
    /// Returns the buffered [`Window`] this [`Reservation`] occupies.
    #[must_use]
    pub fn window(&self) -> Window {
        Window::buffered(self.starts_at, self.ends_at, self.effectively_ends_at)
    }

    /// Indicates whether this [`Reservation`] occupies the venue calendar.
    #[must_use]
    pub fn is_occupying(&self) -> bool {
        self.status != Status::Cancelled
    }

    /// Indicates whether this [`Reservation`] is scheduled at the exact same
    /// time as the provided one.
    #[must_use]
    pub fn is_same_time(
        &self,
        starts_at: StartDateTime,
        ends_at: EndDateTime,
        effectively_ends_at: Option<EffectiveEndDateTime>,
    ) -> bool {
        self.starts_at == starts_at
            && self.ends_at == ends_at
            && self.effectively_ends_at == effectively_ends_at
    }
}

/// ID of a [`Reservation`].
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
    #[doc = "Lifecycle status of a [`Reservation`]."]
    enum Status {
        #[doc = "Awaiting review."]
        Pending = 1,

        #[doc = "Requested by the customer."]
        Requested = 2,

        #[doc = "Approved by the venue."]
        Booked = 3,

        #[doc = "Confirmed by the customer."]
        Confirmed = 4,

        #[doc = "Event is taking place."]
        InProgress = 5,

        #[doc = "Event is over."]
        Done = 6,

        #[doc = "Event is over and settled up."]
        Settled = 7,

        #[doc = "Reservation is closed."]
        Completed = 8,

        #[doc = "Reservation is cancelled and frees its time slot."]
        Cancelled = 9,
    }
}

/// Admin-facing action moving a [`Reservation`] to another [`Status`].
///
/// Any action may be applied to a [`Reservation`] in any [`Status`].
#[derive(Clone, Copy, Debug, EnumString, Eq, PartialEq, strum::Display)]
pub enum Action {
    /// Moves to [`Status::Booked`].
    #[strum(serialize = "Approve")]
    Approve,

    /// Moves to [`Status::Confirmed`].
    #[strum(serialize = "Confirm")]
    Confirm,

    /// Moves to [`Status::Cancelled`], withdrawing the invoice.
    #[strum(to_string = "Cancel", serialize = "cancel")]
    Cancel,

    /// Moves to [`Status::Done`].
    #[strum(serialize = "Mark as Done")]
    MarkAsDone,

    /// Moves to [`Status::Settled`].
    #[strum(serialize = "Mark as Settled")]
    MarkAsSettled,

    /// Moves back to [`Status::Pending`], reissuing the invoice.
    #[strum(serialize = "Restore to Pending")]
    RestoreToPending,

    /// Moves back to [`Status::Booked`], reissuing the invoice.
    #[strum(serialize = "Restore to Booked")]
    RestoreToBooked,
}

impl Action {
    /// All the [`Action`]s.
    pub const ALL: [Self; 7] = [
        Self::Approve,
        Self::Confirm,
        Self::Cancel,
        Self::MarkAsDone,
        Self::MarkAsSettled,
        Self::RestoreToPending,
        Self::RestoreToBooked,
    ];

    /// Returns the [`Status`] this [`Action`] moves a [`Reservation`] to.
    #[must_use]
    pub const fn target(self) -> Status {
        match self {
            Self::Approve | Self::RestoreToBooked => Status::Booked,
            Self::Confirm => Status::Confirmed,
            Self::Cancel => Status::Cancelled,
            Self::MarkAsDone => Status::Done,
            Self::MarkAsSettled => Status::Settled,
            Self::RestoreToPending => Status::Pending,
        }
    }

    /// Parses an [`Action`] out of its admin-facing name.
    ///
    /// # Errors
    ///
    /// With [`UnknownAction`] if the `name` is not a known [`Action`].
    pub fn parse(name: &str) -> Result<Self, UnknownAction> {
        Self::from_str(name).map_err(|_| UnknownAction(name.to_owned()))
    }
}

/// Error of parsing an unknown [`Action`].
#[derive(Clone, Debug, Display, Error)]
#[display("unknown status action: `{_0}`")]
pub struct UnknownAction(#[error(not(source))] pub String);

define_kind! {
    #[doc = "Category of the event a [`Reservation`] is made for."]
    enum EventType {
        #[doc = "Wedding ceremony or reception."]
        Wedding = 1,

        #[doc = "Birthday party."]
        Birthday = 2,

        #[doc = "Quinceañera celebration."]
        Quinceanera = 3,

        #[doc = "Baptism celebration."]
        Baptism = 4,

        #[doc = "Anniversary celebration."]
        Anniversary = 5,

        #[doc = "Graduation party."]
        Graduation = 6,

        #[doc = "Baby shower."]
        BabyShower = 7,

        #[doc = "Corporate event."]
        Corporate = 8,

        #[doc = "Any other event."]
        Other = 9,
    }
}

define_kind! {
    #[doc = "Way the price of a [`Reservation`] was requested to be computed."]
    enum PriceComputationMethod {
        #[doc = "Computed from the rates only."]
        Auto = 1,

        #[doc = "Requested manually by the venue staff."]
        Manual = 2,
    }
}

/// Number of seats booked by a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct SeatCount(u16);

impl SeatCount {
    /// Maximum number of seats the venue has.
    pub const MAX: u16 = 200;

    /// Creates a new [`SeatCount`] if the provided `count` fits the venue.
    #[must_use]
    pub fn new(count: u16) -> Option<Self> {
        (count <= Self::MAX).then_some(Self(count))
    }

    /// Returns the number of seats.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl FromStr for SeatCount {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `SeatCount`")
    }
}

/// Tax rate as a fraction of one (e.g. `0.08` for 8%).
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Creates a new [`TaxRate`] if the provided `rate` lies within the
    /// `0..=1` range.
    #[must_use]
    pub fn new(rate: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE)
            .contains(&rate)
            .then_some(Self(rate))
    }

    /// Returns this [`TaxRate`] as a fraction of one.
    #[must_use]
    pub const fn fraction(self) -> Decimal {
        self.0
    }
}

impl FromStr for TaxRate {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim())
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `TaxRate`")
    }
}

/// Catalog [`AddOn`] requested by a [`Reservation`].
///
/// [`AddOn`]: super::AddOn
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestedAddOn {
    /// ID of the requested [`AddOn`].
    ///
    /// [`AddOn`]: super::AddOn
    pub add_on_id: add_on::Id,

    /// Requested quantity.
    pub quantity: u16,
}

/// Time span a [`Reservation`] occupies on the venue calendar, padded by
/// [`Window::BUFFER`] on both sides.
///
/// The span is half-open: it includes its start and excludes its end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    /// Buffered start of this [`Window`].
    pub starts_at: StartDateTime,

    /// Buffered end of this [`Window`].
    pub ends_at: EndDateTime,
}

impl Window {
    /// Safety buffer between two events.
    pub const BUFFER: Duration = Duration::from_secs(2 * 60 * 60);

    /// Creates a new buffered [`Window`] of an event.
    ///
    /// The actual end is used instead of the scheduled one, once known.
    #[must_use]
    pub fn buffered(
        starts_at: StartDateTime,
        ends_at: EndDateTime,
        effectively_ends_at: Option<EffectiveEndDateTime>,
    ) -> Self {
        let ends_at = effectively_ends_at.map_or(ends_at, DateTimeOf::coerce);
        Self {
            starts_at: starts_at - Self::BUFFER,
            ends_at: ends_at + Self::BUFFER,
        }
    }

    /// Indicates whether this [`Window`] overlaps with the `other` one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.starts_at.coerce::<()>() < other.ends_at.coerce()
            && other.starts_at.coerce::<()>() < self.ends_at.coerce()
    }
}

/// Venue calendar shared by all the [`Reservation`]s.
///
/// Used to serialize concurrent bookings.
#[derive(Clone, Copy, Debug, Default)]
pub struct Calendar;

/// [`DateTime`] when a [`Reservation`] starts.
pub type StartDateTime = DateTimeOf<(Reservation, unit::Start)>;

/// [`DateTime`] when a [`Reservation`] is scheduled to end.
pub type EndDateTime = DateTimeOf<(Reservation, unit::End)>;

/// [`DateTime`] when a [`Reservation`] actually ended.
pub type EffectiveEndDateTime = DateTimeOf<(Reservation, unit::EffectiveEnd)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{Action, SeatCount, Status, TaxRate, Window};

    fn at(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    fn window(start: &str, end: &str) -> Window {
        Window::buffered(at(start).coerce(), at(end).coerce(), None)
    }

    #[test]
    fn every_action_targets_a_status() {
        let cases = [
            ("Approve", Status::Booked),
            ("Confirm", Status::Confirmed),
            ("Cancel", Status::Cancelled),
            ("cancel", Status::Cancelled),
            ("Mark as Done", Status::Done),
            ("Mark as Settled", Status::Settled),
            ("Restore to Pending", Status::Pending),
            ("Restore to Booked", Status::Booked),
        ];
        for (name, status) in cases {
            assert_eq!(Action::parse(name).unwrap().target(), status, "{name}");
        }
        for a in Action::ALL {
            assert_eq!(Action::parse(&a.to_string()).unwrap(), a);
        }
    }

    #[test]
    fn rejects_unknown_action() {
        for name in ["", "approve", "Mark as done", "Delete", "Booked"] {
            let err = Action::parse(name).unwrap_err();
            assert_eq!(err.0, name);
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(Status::InProgress.to_string(), "InProgress");
        assert_eq!("Cancelled".parse::<Status>().unwrap(), Status::Cancelled);
        assert_eq!(Status::Cancelled.u8(), 9);
        assert_eq!(Status::ALL.len(), 9);
    }

    #[test]
    fn seats_are_bounded() {
        assert!(SeatCount::new(0).is_some());
        assert!(SeatCount::new(200).is_some());
        assert!(SeatCount::new(201).is_none());
        assert!("-1".parse::<SeatCount>().is_err());
    }

    #[test]
    fn tax_rate_is_a_fraction() {
        assert!("0.08".parse::<TaxRate>().is_ok());
        assert!("8".parse::<TaxRate>().is_err());
        assert!("-0.1".parse::<TaxRate>().is_err());
    }

    #[test]
    fn window_is_buffered() {
        let w = window("2025-06-01, 06:00 PM", "2025-06-01, 11:00 PM");
        assert_eq!(w.starts_at.coerce::<()>().format(), "2025-06-01, 04:00 PM");
        assert_eq!(w.ends_at.coerce::<()>().format(), "2025-06-02, 01:00 AM");

        let effective = Window::buffered(
            at("2025-06-01, 06:00 PM").coerce(),
            at("2025-06-01, 11:00 PM").coerce(),
            Some(at("2025-06-02, 02:00 AM").coerce()),
        );
        assert_eq!(
            effective.ends_at.coerce::<()>().format(),
            "2025-06-02, 04:00 AM",
        );
    }

    #[test]
    fn overlapping_windows() {
        let a = window("2025-06-01, 06:00 PM", "2025-06-01, 11:00 PM");
        let b = window("2025-06-01, 08:00 PM", "2025-06-01, 10:00 PM");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        // Partial overlap from either side.
        let c = window("2025-06-01, 01:00 PM", "2025-06-01, 03:00 PM");
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));

        // Exactly 4 hours apart: buffers touch but don't overlap.
        let d = window("2025-06-02, 03:00 AM", "2025-06-02, 05:00 AM");
        assert!(!a.overlaps(&d));
        assert!(!d.overlaps(&a));
    }
}
