//! Rate definitions.

use std::collections::HashMap;

use common::Money;
use derive_more::{Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use uuid::Uuid;

use super::{AddOn, Fingerprint};

/// Full table of rates a price may be computed from.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault,
)]
#[serde(default)]
pub struct Table {
    /// Price of a single seat.
    #[default(Money::new(Decimal::new(25, 1)))]
    pub seat: Money,

    /// Price of a single overtime hour.
    #[default(Money::from(500))]
    pub overtime: Money,

    /// Facility fee of any day except Saturday.
    #[default(Money::from(1500))]
    pub regular_facility: Money,

    /// Facility fee of Saturday.
    #[default(Money::from(2000))]
    pub saturday_facility: Money,

    /// Cleaning fee of an event with up to [`Table::SMALL_GUEST_LIMIT`]
    /// seats.
    #[default(Money::from(150))]
    pub small_guest_cleaning: Money,

    /// Cleaning fee of a larger event.
    #[default(Money::from(250))]
    pub large_guest_cleaning: Money,
}

impl Table {
    /// Maximum number of seats still cleaned at the
    /// [`Table::small_guest_cleaning`] rate.
    pub const SMALL_GUEST_LIMIT: u16 = 100;

    /// Returns the rate of the provided [`Kind`].
    #[must_use]
    pub fn get(&self, kind: Kind) -> Money {
        match kind {
            Kind::Seat => self.seat,
            Kind::Overtime => self.overtime,
            Kind::RegularFacility => self.regular_facility,
            Kind::SaturdayFacility => self.saturday_facility,
            Kind::SmallGuestCleaning => self.small_guest_cleaning,
            Kind::LargeGuestCleaning => self.large_guest_cleaning,
        }
    }

    /// Resolves the effective [`Table`], taking every rate the `primary`
    /// [`Provider`] knows and the rest from these `defaults`.
    #[must_use]
    pub fn resolve<P: Provider + ?Sized>(primary: &P, defaults: &Self) -> Self {
        let rates = Fallback { primary, defaults };
        Self {
            seat: rates.get(Kind::Seat),
            overtime: rates.get(Kind::Overtime),
            regular_facility: rates.get(Kind::RegularFacility),
            saturday_facility: rates.get(Kind::SaturdayFacility),
            small_guest_cleaning: rates.get(Kind::SmallGuestCleaning),
            large_guest_cleaning: rates.get(Kind::LargeGuestCleaning),
        }
    }
}

/// Kind of a rate in a [`Table`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Kind {
    /// [`Table::seat`].
    Seat,

    /// [`Table::overtime`].
    Overtime,

    /// [`Table::regular_facility`].
    RegularFacility,

    /// [`Table::saturday_facility`].
    SaturdayFacility,

    /// [`Table::small_guest_cleaning`].
    SmallGuestCleaning,

    /// [`Table::large_guest_cleaning`].
    LargeGuestCleaning,
}

impl Kind {
    /// All the [`Kind`]s.
    pub const ALL: [Self; 6] = [
        Self::Seat,
        Self::Overtime,
        Self::RegularFacility,
        Self::SaturdayFacility,
        Self::SmallGuestCleaning,
        Self::LargeGuestCleaning,
    ];

    /// Returns the name of the catalog [`AddOn`] overriding this [`Kind`]
    /// of rate.
    #[must_use]
    pub const fn override_name(self) -> &'static str {
        match self {
            Self::Seat => "Seat Rate",
            Self::Overtime => "Overtime Rate",
            Self::RegularFacility => "Regular Facility Rate",
            Self::SaturdayFacility => "Saturday Facility Rate",
            Self::SmallGuestCleaning => "Small Guest Cleaning Rate",
            Self::LargeGuestCleaning => "Large Guest Cleaning Rate",
        }
    }

    /// Parses a [`Kind`] out of the name of an overriding [`AddOn`].
    #[must_use]
    pub fn from_override_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.override_name() == name)
    }
}

/// Source of rates, which may know only some of them.
pub trait Provider {
    /// Returns the rate of the provided [`Kind`], if known.
    fn rate(&self, kind: Kind) -> Option<Money>;
}

impl Provider for Table {
    fn rate(&self, kind: Kind) -> Option<Money> {
        Some(self.get(kind))
    }
}

/// Rates overridden by the [`AddOn`] catalog.
#[derive(Clone, Debug, Default)]
pub struct Overrides(HashMap<Kind, Money>);

impl Overrides {
    /// Collects the [`Overrides`] out of the provided catalog entries,
    /// ignoring the ones not named after any rate [`Kind`].
    #[must_use]
    pub fn from_catalog<'a>(add_ons: impl IntoIterator<Item = &'a AddOn>) -> Self {
        Self(
            add_ons
                .into_iter()
                .filter_map(|a| {
                    Kind::from_override_name(a.name.as_ref())
                        .map(|k| (k, a.price))
                })
                .collect(),
        )
    }

    /// Returns names of all the catalog entries able to override a rate.
    #[must_use]
    pub fn catalog_names() -> Vec<super::add_on::Name> {
        Kind::ALL
            .into_iter()
            .filter_map(|k| super::add_on::Name::new(k.override_name()))
            .collect()
    }
}

impl Provider for Overrides {
    fn rate(&self, kind: Kind) -> Option<Money> {
        self.0.get(&kind).copied()
    }
}

/// [`Provider`] taking rates from the `primary` one and falling back to
/// the `defaults` for the unknown ones.
#[derive(Clone, Copy, Debug)]
pub struct Fallback<'a, P: ?Sized> {
    /// [`Provider`] asked first.
    pub primary: &'a P,

    /// [`Table`] of the default rates.
    pub defaults: &'a Table,
}

impl<P: Provider + ?Sized> Fallback<'_, P> {
    /// Returns the effective rate of the provided [`Kind`].
    #[must_use]
    pub fn get(&self, kind: Kind) -> Money {
        self.primary
            .rate(kind)
            .unwrap_or_else(|| self.defaults.get(kind))
    }
}

impl<P: Provider + ?Sized> Provider for Fallback<'_, P> {
    fn rate(&self, kind: Kind) -> Option<Money> {
        Some(self.get(kind))
    }
}

/// Frozen copy of the rates applied to a single reservation.
///
/// Snapshots are content-addressed: identical rates share one [`Id`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Snapshot {
    /// Price of a single seat.
    pub seat: Money,

    /// Facility fee of the reservation day.
    pub facility: Money,

    /// Price of a single overtime hour.
    pub overtime: Money,

    /// Cleaning fee matching the number of seats.
    pub cleaning: Money,
}

impl Snapshot {
    /// Calculates the content-addressed [`Id`] of this [`Snapshot`].
    #[must_use]
    pub fn id(&self) -> Id {
        // WARNING: Avoid changing the order of the fields, because it will
        //          change the IDs of all the already stored snapshots.
        Id(Fingerprint::new("rate")
            .money(self.seat)
            .money(self.facility)
            .money(self.overtime)
            .money(self.cleaning)
            .finish())
    }
}

/// Content-addressed ID of a [`Snapshot`].
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

#[cfg(test)]
mod spec {
    use common::Money;

    use super::{AddOn, Kind, Overrides, Snapshot, Table};
    use crate::domain::add_on;

    fn add_on(id: i64, name: &str, price: u32) -> AddOn {
        AddOn {
            id: add_on::Id::from(id),
            name: add_on::Name::new(name).unwrap(),
            price: Money::from(price),
        }
    }

    #[test]
    fn defaults() {
        let t = Table::default();
        assert_eq!(t.seat.to_string(), "2.50");
        assert_eq!(t.overtime, Money::from(500));
        assert_eq!(t.regular_facility, Money::from(1500));
        assert_eq!(t.saturday_facility, Money::from(2000));
        assert_eq!(t.small_guest_cleaning, Money::from(150));
        assert_eq!(t.large_guest_cleaning, Money::from(250));
    }

    #[test]
    fn overrides_fall_back_to_defaults() {
        let catalog = [
            add_on(1, "Seat Rate", 3),
            add_on(2, "Chair Covers", 40),
            add_on(3, "Saturday Facility Rate", 2200),
        ];
        let overrides = Overrides::from_catalog(&catalog);

        let t = Table::resolve(&overrides, &Table::default());
        assert_eq!(t.seat, Money::from(3));
        assert_eq!(t.saturday_facility, Money::from(2200));
        assert_eq!(t.regular_facility, Money::from(1500));
        assert_eq!(t.overtime, Money::from(500));

        assert_eq!(
            Table::resolve(&Overrides::default(), &Table::default()),
            Table::default(),
        );
    }

    #[test]
    fn override_names_are_closed() {
        for k in Kind::ALL {
            assert_eq!(Kind::from_override_name(k.override_name()), Some(k));
        }
        assert_eq!(Kind::from_override_name("seat rate"), None);
        assert_eq!(Overrides::catalog_names().len(), Kind::ALL.len());
    }

    #[test]
    fn snapshot_id_is_content_addressed() {
        let a = Snapshot {
            seat: "2.5".parse().unwrap(),
            facility: Money::from(1500),
            overtime: Money::from(500),
            cleaning: Money::from(150),
        };
        let b = Snapshot {
            seat: "2.50".parse().unwrap(),
            ..a
        };
        assert_eq!(a.id(), b.id());

        let c = Snapshot {
            facility: Money::from(2000),
            ..a
        };
        assert_ne!(a.id(), c.id());

        let swapped = Snapshot {
            overtime: a.cleaning,
            cleaning: a.overtime,
            ..a
        };
        assert_ne!(a.id(), swapped.id());
    }
}
