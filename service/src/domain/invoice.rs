//! [`Invoice`] definitions.

use std::{cmp, str::FromStr, time::Duration};

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error as StdError, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

use super::{reservation, user, Reservation};

/// Bill of a single [`Reservation`].
///
/// Every [`Reservation`] has exactly one [`Invoice`], issued together with
/// it.
#[derive(Clone, Debug)]
pub struct Invoice {
    /// ID of this [`Invoice`].
    pub id: Id,

    /// Unique [`Number`] of this [`Invoice`].
    pub number: Number,

    /// ID of the [`Reservation`] this [`Invoice`] bills.
    pub reservation_id: reservation::Id,

    /// ID of the billed [`User`].
    ///
    /// [`User`]: super::User
    pub user_id: user::Id,

    /// [`DateTime`] when this [`Invoice`] was issued.
    pub issued_at: IssueDateTime,

    /// [`DateTime`] when this [`Invoice`] is due.
    pub due_at: DueDateTime,

    /// Amount still to be paid.
    pub amount_due: Money,

    /// Amount paid so far.
    pub total_amount_paid: Money,

    /// [`Status`] of this [`Invoice`].
    pub status: Status,
}

impl Invoice {
    /// Issues a new [`Invoice`] for the provided [`Reservation`].
    ///
    /// The [`Invoice`] is due the `lead_time` before the event, but never
    /// earlier than `now`.
    #[must_use]
    pub fn for_reservation(
        id: Id,
        reservation: &Reservation,
        lead_time: Duration,
        now: IssueDateTime,
    ) -> Self {
        let due_at: DueDateTime =
            cmp::max(reservation.starts_at.coerce() - lead_time, now.coerce());
        Self {
            id,
            number: Number::for_reservation(reservation.id),
            reservation_id: reservation.id,
            user_id: reservation.user_id.clone(),
            issued_at: now,
            due_at,
            amount_due: reservation.total_price,
            total_amount_paid: Money::ZERO,
            status: Status::Due,
        }
    }

    /// Mirrors the provided [`reservation::Status`] in this [`Invoice`].
    ///
    /// A cancelled [`Reservation`] withdraws its [`Invoice`], while any
    /// other one makes it [`Status::Due`] again.
    pub fn reflect_status(&mut self, status: reservation::Status) {
        self.status = if status == reservation::Status::Cancelled {
            Status::Withdrawn
        } else {
            Status::Due
        };
    }

    /// Makes this [`Invoice`] due right `now` if the event starts within the
    /// `lead_time` and it's not settled yet.
    ///
    /// Returns whether this [`Invoice`] was escalated.
    pub fn escalate_if_near_due(
        &mut self,
        starts_at: reservation::StartDateTime,
        lead_time: Duration,
        now: IssueDateTime,
    ) -> bool {
        if matches!(self.status, Status::Paid | Status::Withdrawn)
            || starts_at.coerce::<()>() - lead_time >= now.coerce()
        {
            return false;
        }
        self.due_at = now.coerce();
        self.status = Status::Due;
        true
    }

    /// Recomputes the amount due out of a new `total_price` of the
    /// [`Reservation`], keeping what's already paid.
    ///
    /// The [`Status`] follows the new balance, unless this [`Invoice`] is
    /// [`Status::Withdrawn`].
    ///
    /// # Errors
    ///
    /// If the `total_price` is below the amount already paid. This
    /// [`Invoice`] stays untouched then.
    pub fn reprice(&mut self, total_price: Money) -> Result<(), BelowPaid> {
        if total_price < self.total_amount_paid {
            return Err(BelowPaid {
                total: total_price,
                paid: self.total_amount_paid,
            });
        }

        self.amount_due = total_price - self.total_amount_paid;
        self.status = match self.status {
            Status::Withdrawn => Status::Withdrawn,
            _ if self.amount_due.is_zero() => Status::Paid,
            _ if !self.total_amount_paid.is_zero() => Status::PartiallyPaid,
            Status::Paid | Status::PartiallyPaid => Status::Due,
            s @ (Status::Due | Status::DueImmediately | Status::Overdue) => s,
        };
        Ok(())
    }
}

/// Error of repricing an [`Invoice`] below the amount already paid for it.
#[derive(Clone, Copy, Debug, Display, StdError)]
#[display("new total {total} is below the already paid {paid}")]
pub struct BelowPaid {
    /// New total price of the [`Reservation`].
    pub total: Money,

    /// Amount already paid for the [`Invoice`].
    pub paid: Money,
}

/// ID of an [`Invoice`].
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

/// Human-readable unique number of an [`Invoice`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Prefix of every [`Number`].
    const PREFIX: &'static str = "INV-000";

    /// Creates the [`Number`] of the [`Invoice`] billing the [`Reservation`]
    /// with the provided ID.
    #[must_use]
    pub fn for_reservation(id: reservation::Id) -> Self {
        Self(format!("{}{id}", Self::PREFIX))
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(Self::PREFIX)
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .map(|_| Self(s.to_owned()))
            .ok_or("invalid `invoice::Number`")
    }
}

define_kind! {
    #[doc = "Status of an [`Invoice`]."]
    enum Status {
        #[doc = "Waiting for a payment until the due date."]
        Due = 1,

        #[doc = "Must be paid right away."]
        DueImmediately = 2,

        #[doc = "Paid in part."]
        PartiallyPaid = 3,

        #[doc = "Paid in full."]
        Paid = 4,

        #[doc = "Not paid in time."]
        Overdue = 5,

        #[doc = "Withdrawn along with the cancelled reservation."]
        Withdrawn = 6,
    }
}

/// [`DateTime`] when an [`Invoice`] was issued.
pub type IssueDateTime = DateTimeOf<(Invoice, unit::Creation)>;

/// [`DateTime`] when an [`Invoice`] is due.
pub type DueDateTime = DateTimeOf<(Invoice, unit::Due)>;
