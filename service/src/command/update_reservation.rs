//! [`Command`] for updating an existing [`Reservation`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Notify, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    availability::{self, Violation},
    domain::{
        add_on, invoice, rate, reservation, user, Discount, Invoice,
        Notification, Reservation, User,
    },
    infra::{
        database::{self, constraint},
        notifier, Database, Notifier,
    },
    pricing::Price,
    query::{quote, Quote},
    read::reservation::Occupied,
    Query, Service,
};

use super::{create_reservation::Booking, Command};

/// [`Command`] for updating the [`Booking`] details of an existing
/// [`Reservation`].
///
/// The price is always recomputed, and the [`Invoice`] of the
/// [`Reservation`] (if any) is repriced accordingly.
#[derive(Clone, Debug)]
pub struct UpdateReservation {
    /// ID of the [`Reservation`] to update.
    pub id: reservation::Id,

    /// ID of the [`User`] owning the [`Reservation`].
    ///
    /// Cannot be changed.
    pub user_id: Option<user::Id>,

    /// New [`Booking`] details of the [`Reservation`].
    pub booking: Booking,
}

impl<Db, Ntf> Command<UpdateReservation> for Service<Db, Ntf>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Reservation, reservation::Calendar>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Occupied>, reservation::Window>>,
            Ok = Vec<Occupied>,
            Err = Traced<database::Error>,
        > + Database<Insert<rate::Snapshot>, Err = Traced<database::Error>>
        + Database<Insert<Discount>, Err = Traced<database::Error>>
        + Database<Update<Reservation>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Invoice>, reservation::Id>>,
            Ok = Option<Invoice>,
            Err = Traced<database::Error>,
        > + Database<Update<Invoice>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Notify<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
    Self: Query<Quote, Ok = Price, Err = Traced<quote::ExecutionError>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateReservation {
            id,
            user_id,
            booking,
        } = cmd;

        let user_id = user_id.ok_or(E::MissingUserId).map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes availability checks of concurrent bookings.
        tx.execute(Lock(By::new(reservation::Calendar)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(id))
            .map_err(tracerr::wrap!())?;
        if existing.user_id != user_id {
            return Err(tracerr::new!(E::UserMismatch(id)));
        }

        let now = DateTime::now();
        let is_rescheduled = !existing.is_same_time(
            booking.starts_at,
            booking.ends_at,
            booking.effectively_ends_at,
        );
        // Already started events may be prolonged, but not moved to the past.
        let now_if_moved =
            (booking.starts_at != existing.starts_at).then_some(now);
        booking
            .validate(now_if_moved)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        if is_rescheduled && existing.is_occupying() {
            let window = booking.window();
            let occupied = tx
                .execute(Select(By::new(window)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if let Some(taken) =
                availability::find_conflict(&window, &occupied, Some(id))
            {
                log::debug!(
                    "time slot is occupied by `Reservation(id: {taken})`",
                );
                return Err(tracerr::new!(E::SlotOccupied));
            }
        }

        let price = self
            .execute(Quote(booking.pricing_input()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let reservation =
            booking.into_reservation(id, user_id, existing.status, &price);

        // Repriced ahead of any write, so a rejected price changes nothing.
        let invoice = tx
            .execute(Select(By::<Option<Invoice>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(|mut invoice| {
                invoice.reprice(reservation.total_price)?;
                _ = invoice.escalate_if_near_due(
                    reservation.starts_at,
                    self.config().lead_time,
                    now.coerce(),
                );
                Ok::<_, invoice::BelowPaid>(invoice)
            })
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Insert(reservation.rates))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        if let Some(discount) = reservation.discount.clone() {
            tx.execute(Insert(discount))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Update(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if e.as_ref().is_slot_violation() {
                    tracerr::new!(E::SlotOccupied)
                } else {
                    e
                }
            })
            .map(drop)?;

        if let Some(invoice) = &invoice {
            tx.execute(Update(invoice.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify_user(&reservation.user_id, |user| {
            let mut notifications =
                vec![Notification::reservation_updated(&reservation, user)];
            notifications.extend(
                invoice.iter().map(|i| Notification::invoice_updated(i, user)),
            );
            notifications
        })
        .await;

        Ok(reservation)
    }
}

/// Error of [`UpdateReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`AddOn`] with the provided ID does not exist.
    ///
    /// [`AddOn`]: crate::domain::AddOn
    #[display("`AddOn(id: {_0})` does not exist")]
    AddOnNotExists(#[error(not(source))] add_on::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// No [`User`] ID provided.
    #[display("`User` ID is required")]
    MissingUserId,

    /// New price is below the amount already paid for the [`Invoice`].
    #[display("`Reservation` cannot be repriced: {_0}")]
    #[from]
    PriceBelowPaid(invoice::BelowPaid),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Requested time is invalid.
    #[display("{_0}")]
    #[from]
    Schedule(Violation),

    /// Requested time slot overlaps another [`Reservation`].
    #[display("Requested time slot is occupied")]
    SlotOccupied,

    /// Provided [`User`] doesn't own the [`Reservation`].
    #[display("`Reservation(id: {_0})` belongs to another `User`")]
    UserMismatch(#[error(not(source))] reservation::Id),
}

impl ExecutionError {
    /// Checks whether this [`ExecutionError`] is a [`Database`] violation of
    /// the time slot exclusion.
    fn is_slot_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(e) if e.is_exclusion_violation(Some(constraint::RESERVATION_SLOT)),
        )
    }
}

impl From<quote::ExecutionError> for ExecutionError {
    fn from(e: quote::ExecutionError) -> Self {
        match e {
            quote::ExecutionError::AddOnNotExists(id) => {
                Self::AddOnNotExists(id)
            }
            quote::ExecutionError::Db(e) => Self::Db(e),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{
        command::{
            create_receipt::NewPayment,
            create_reservation::spec::{at, booking, create, money, service},
            Command as _, CreateReceipt, UpdateReservation,
        },
        domain::{
            invoice, notification::Template, receipt, receipt::payment, user,
        },
        infra::notifier::Recorder,
    };

    use super::ExecutionError;

    fn update(id: i64, start: &str, end: &str, seats: u16) -> UpdateReservation {
        UpdateReservation {
            id: id.into(),
            user_id: user::Id::new("u-1"),
            booking: booking(start, end, seats),
        }
    }

    #[tokio::test]
    async fn reprices_reservation_and_invoice() {
        let notifier = Recorder::default();
        let (service, db) = service(notifier.clone());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let r = service
            .execute(update(
                1,
                "2099-06-06, 06:00 PM",
                "2099-06-06, 11:00 PM",
                80,
            ))
            .await
            .unwrap();

        assert_eq!(r.total_price, money("2538"));
        let invoice = db.invoice_of(r.id).unwrap();
        assert_eq!(invoice.amount_due, money("2538"));
        assert_eq!(invoice.total_amount_paid, Money::ZERO);
        assert_eq!(invoice.status, invoice::Status::Due);
        assert_eq!(
            notifier.templates()[2..],
            [Template::ReservationUpdated, Template::InvoiceUpdated],
        );
    }

    #[tokio::test]
    async fn keeps_own_slot() {
        let (service, _) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        // Overlaps only its own previous window.
        let r = service
            .execute(update(
                1,
                "2099-06-01, 07:00 PM",
                "2099-06-01, 11:30 PM",
                120,
            ))
            .await
            .unwrap();

        // (300 + 1500 + 250) * 1.08
        assert_eq!(r.total_price, money("2214"));
    }

    #[tokio::test]
    async fn rejects_occupied_slot() {
        let (service, db) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();
        _ = service
            .execute(create(2, "2099-06-03, 06:00 PM", "2099-06-03, 11:00 PM"))
            .await
            .unwrap();

        let err = service
            .execute(update(
                2,
                "2099-06-01, 09:00 PM",
                "2099-06-01, 11:00 PM",
                80,
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SlotOccupied), "{err}");
        assert_eq!(
            db.reservation(2.into()).unwrap().starts_at.coerce::<()>(),
            at("2099-06-03, 06:00 PM"),
        );
    }

    #[tokio::test]
    async fn keeps_owner() {
        let (service, _) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let mut cmd =
            update(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM", 80);
        cmd.user_id = user::Id::new("u-2");
        let err = service.execute(cmd).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::UserMismatch(_)),
            "{err}",
        );

        let err = service
            .execute(update(
                9,
                "2099-06-01, 06:00 PM",
                "2099-06-01, 11:00 PM",
                80,
            ))
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::ReservationNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn reopens_paid_invoice_on_price_raise() {
        let (service, db) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();
        _ = service
            .execute(CreateReceipt {
                invoice_id: 1.into(),
                payments: vec![NewPayment {
                    method: payment::Method::Card,
                    amount: money("1998"),
                    card_last_four: None,
                    other_details: None,
                }],
                paid_by: receipt::Name::new("Ana Reyes").unwrap(),
                paid_at: None,
                cashier_name: receipt::Name::new("Front Desk").unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(db.invoice_of(1.into()).unwrap().status, invoice::Status::Paid);

        // (500 + 1500 + 250) * 1.08
        let r = service
            .execute(update(
                1,
                "2099-06-01, 06:00 PM",
                "2099-06-01, 11:00 PM",
                200,
            ))
            .await
            .unwrap();
        assert_eq!(r.total_price, money("2430"));

        let invoice = db.invoice_of(1.into()).unwrap();
        assert_eq!(invoice.status, invoice::Status::PartiallyPaid);
        assert_eq!(invoice.amount_due, money("432"));
        assert_eq!(invoice.total_amount_paid, money("1998"));
        assert_eq!(invoice.amount_due + invoice.total_amount_paid, r.total_price);

        // (25 + 1500 + 150) * 1.08 = 1809, below the paid 1998.
        let err = service
            .execute(update(
                1,
                "2099-06-01, 06:00 PM",
                "2099-06-01, 11:00 PM",
                10,
            ))
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::PriceBelowPaid(_)),
            "{err}",
        );

        let stored = db.reservation(1.into()).unwrap();
        assert_eq!(stored.seats.get(), 200);
        assert_eq!(stored.total_price, money("2430"));
        let invoice = db.invoice_of(1.into()).unwrap();
        assert_eq!(invoice.status, invoice::Status::PartiallyPaid);
        assert_eq!(invoice.amount_due, money("432"));
    }
}
