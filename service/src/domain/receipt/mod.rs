//! [`Receipt`] definitions.

pub mod payment;

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

use super::{invoice, reservation, user, Invoice};

pub use self::payment::Payment;

/// Append-only record of a single payment session against an [`Invoice`].
///
/// Snapshot fields are fixed once the [`Receipt`] is created and never
/// recomputed out of later state.
#[derive(Clone, Debug)]
pub struct Receipt {
    /// ID of this [`Receipt`].
    pub id: Id,

    /// Unique [`Number`] of this [`Receipt`].
    pub number: Number,

    /// [`DateTime`] when this [`Receipt`] was issued.
    pub issued_at: IssueDateTime,

    /// Sum of all the [`Receipt::payments`].
    pub amount_paid: Money,

    /// ID of the paid [`Reservation`].
    ///
    /// [`Reservation`]: super::Reservation
    pub reservation_id: reservation::Id,

    /// ID of the paying [`User`].
    ///
    /// [`User`]: super::User
    pub user_id: user::Id,

    /// ID of the paid [`Invoice`].
    pub invoice_id: invoice::Id,

    /// [`Payment`]s of this session, in the order they were made.
    pub payments: Vec<Payment>,

    /// Total amount paid for the [`Invoice`], including this session.
    pub total_amount_paid_till_today: Money,

    /// [`Name`] of the payer.
    pub paid_by: Name,

    /// [`DateTime`] when the payments were made.
    pub paid_at: PaymentDateTime,

    /// Amount due before this session.
    pub prev_balance: Money,

    /// Amount due after this session.
    pub balance_due: Money,

    /// [`Name`] of the cashier who accepted the payments.
    pub cashier_name: Name,
}

impl Receipt {
    /// Applies this [`Receipt`] to the provided [`Invoice`] of a reservation
    /// costing `total_price`, filling the snapshot fields of this
    /// [`Receipt`].
    ///
    /// `is_first` indicates that no other [`Receipt`] was applied to the
    /// [`Invoice`] before.
    ///
    /// Afterwards, `amount_due + total_amount_paid` of the [`Invoice`] equals
    /// the `total_price`.
    ///
    /// # Errors
    ///
    /// With a [`Rejection`] if this session cannot be applied. Nothing is
    /// changed in such case.
    pub fn apply_to(
        &mut self,
        invoice: &mut Invoice,
        total_price: Money,
        is_first: bool,
    ) -> Result<(), Rejection> {
        use Rejection as R;

        if self.payments.is_empty() {
            return Err(R::NoPayments);
        }
        if let Some(p) = self
            .payments
            .iter()
            .find(|p| p.amount.is_negative() || p.amount.is_zero())
        {
            return Err(R::NonPositivePayment(p.amount));
        }
        if invoice.amount_due.is_negative() {
            return Err(R::NegativeAmountDue(invoice.amount_due));
        }

        let amount_paid = self.payments.iter().map(|p| p.amount).sum();
        if amount_paid > invoice.amount_due {
            return Err(R::Overpayment {
                paid: amount_paid,
                due: invoice.amount_due,
            });
        }
        self.amount_paid = amount_paid;

        self.prev_balance = if is_first {
            total_price
        } else {
            invoice.amount_due
        };

        invoice.total_amount_paid += self.amount_paid;
        if self.amount_paid == invoice.amount_due {
            invoice.amount_due = Money::ZERO;
            invoice.status = invoice::Status::Paid;
        } else {
            invoice.amount_due = total_price - invoice.total_amount_paid;
            invoice.status = invoice::Status::PartiallyPaid;
        }

        self.total_amount_paid_till_today = invoice.total_amount_paid;
        self.balance_due = invoice.amount_due;

        Ok(())
    }
}

/// Reason of rejecting a [`Receipt`] session.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum Rejection {
    /// [`Receipt`] contains no [`Payment`]s.
    #[display("payment session contains no payments")]
    NoPayments,

    /// [`Payment`] of a non-positive amount.
    #[display("payment amount must be positive, got {_0}")]
    NonPositivePayment(#[error(not(source))] Money),

    /// [`Invoice`] amount due is negative.
    #[display("`Invoice` amount due is negative: {_0}")]
    NegativeAmountDue(#[error(not(source))] Money),

    /// Session pays more than is due.
    #[display("paid {paid} exceeds the amount due {due}")]
    Overpayment {
        /// Amount paid in the session.
        paid: Money,

        /// Amount due before the session.
        due: Money,
    },
}

/// ID of a [`Receipt`].
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

/// Human-readable unique number of a [`Receipt`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Creates the [`Number`] of the `sequence`-th [`Receipt`] (counting
    /// from `1`) of the provided [`Invoice`].
    #[must_use]
    pub fn new(
        reservation_id: reservation::Id,
        invoice_id: invoice::Id,
        sequence: usize,
    ) -> Self {
        Self(format!("RR{reservation_id}IN000{invoice_id}{sequence}"))
    }
}

/// Name of a person on a [`Receipt`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
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
        Self::new(s).ok_or("invalid `receipt::Name`")
    }
}

/// [`DateTime`] when a [`Receipt`] was issued.
pub type IssueDateTime = DateTimeOf<(Receipt, unit::Creation)>;

/// [`DateTime`] when the [`Payment`]s of a [`Receipt`] were made.
pub type PaymentDateTime = DateTimeOf<(Receipt, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use super::{payment, Name, Number, Payment, Receipt, Rejection};
    use crate::domain::{invoice, reservation, user, Invoice};

    fn invoice(amount_due: u32) -> Invoice {
        let now = DateTime::now();
        Invoice {
            id: invoice::Id::from(7),
            number: invoice::Number::for_reservation(reservation::Id::from(42)),
            reservation_id: reservation::Id::from(42),
            user_id: user::Id::new("u-1").unwrap(),
            issued_at: now.coerce(),
            due_at: now.coerce(),
            amount_due: Money::from(amount_due),
            total_amount_paid: Money::ZERO,
            status: invoice::Status::Due,
        }
    }

    fn receipt(amounts: &[&str]) -> Receipt {
        let now = DateTime::now();
        Receipt {
            id: super::Id::from(1),
            number: Number::new(
                reservation::Id::from(42),
                invoice::Id::from(7),
                1,
            ),
            issued_at: now.coerce(),
            amount_paid: Money::ZERO,
            reservation_id: reservation::Id::from(42),
            user_id: user::Id::new("u-1").unwrap(),
            invoice_id: invoice::Id::from(7),
            payments: amounts
                .iter()
                .zip(1..)
                .map(|(a, id)| Payment {
                    id: payment::Id::from(id),
                    receipt_id: super::Id::from(1),
                    method: payment::Method::Cash,
                    amount: a.parse().unwrap(),
                    card_last_four: None,
                    other_details: None,
                })
                .collect(),
            total_amount_paid_till_today: Money::ZERO,
            paid_by: Name::new("Jane Doe").unwrap(),
            paid_at: now.coerce(),
            prev_balance: Money::ZERO,
            balance_due: Money::ZERO,
            cashier_name: Name::new("John Roe").unwrap(),
        }
    }

    #[test]
    fn numbers_receipts() {
        let n = Number::new(reservation::Id::from(42), invoice::Id::from(7), 3);
        assert_eq!(n.to_string(), "RR42IN00073");
    }

    #[test]
    fn pays_in_parts() {
        let total = Money::from(1998);
        let mut inv = invoice(1998);

        let mut first = receipt(&["600", "400"]);
        first.apply_to(&mut inv, total, true).unwrap();
        assert_eq!(first.amount_paid, Money::from(1000));
        assert_eq!(first.prev_balance, total);
        assert_eq!(first.balance_due, Money::from(998));
        assert_eq!(first.total_amount_paid_till_today, Money::from(1000));
        assert_eq!(inv.amount_due, Money::from(998));
        assert_eq!(inv.total_amount_paid, Money::from(1000));
        assert_eq!(inv.status, invoice::Status::PartiallyPaid);
        assert_eq!(inv.amount_due + inv.total_amount_paid, total);

        let mut second = receipt(&["998"]);
        second.apply_to(&mut inv, total, false).unwrap();
        assert_eq!(second.prev_balance, Money::from(998));
        assert_eq!(second.balance_due, Money::ZERO);
        assert_eq!(second.total_amount_paid_till_today, total);
        assert_eq!(inv.amount_due, Money::ZERO);
        assert_eq!(inv.status, invoice::Status::Paid);
        assert_eq!(inv.amount_due + inv.total_amount_paid, total);

        // Receipts are snapshots.
        assert_eq!(first.balance_due, Money::from(998));
    }

    #[test]
    fn pays_in_full_at_once() {
        let total = Money::from(1998);
        let mut inv = invoice(1998);

        let mut r = receipt(&["1998.00"]);
        r.apply_to(&mut inv, total, true).unwrap();
        assert_eq!(inv.status, invoice::Status::Paid);
        assert_eq!(inv.total_amount_paid, total);
        assert_eq!(r.total_amount_paid_till_today, total);
    }

    #[test]
    fn rejects_invalid_sessions() {
        let total = Money::from(1998);
        let mut inv = invoice(1998);

        assert!(matches!(
            receipt(&[]).apply_to(&mut inv, total, true),
            Err(Rejection::NoPayments),
        ));
        assert!(matches!(
            receipt(&["100", "0"]).apply_to(&mut inv, total, true),
            Err(Rejection::NonPositivePayment(_)),
        ));
        assert!(matches!(
            receipt(&["-5"]).apply_to(&mut inv, total, true),
            Err(Rejection::NonPositivePayment(_)),
        ));
        assert!(matches!(
            receipt(&["1998.01"]).apply_to(&mut inv, total, true),
            Err(Rejection::Overpayment { .. }),
        ));

        assert_eq!(inv.amount_due, total);
        assert_eq!(inv.total_amount_paid, Money::ZERO);
        assert_eq!(inv.status, invoice::Status::Due);

        inv.amount_due = "-1".parse().unwrap();
        assert!(matches!(
            receipt(&["1"]).apply_to(&mut inv, total, false),
            Err(Rejection::NegativeAmountDue(_)),
        ));
    }
}
