//! [`Command`] for creating a new [`Reservation`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Notify, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::reservation::Status;
use crate::{
    availability::{self, Violation},
    domain::{
        add_on, invoice, rate,
        reservation::{
            self, EffectiveEndDateTime, EndDateTime, EventType,
            PriceComputationMethod, RequestedAddOn, SeatCount, StartDateTime,
            TaxRate,
        },
        user, Discount, Invoice, Notification, Reservation, User,
    },
    infra::{
        database::{self, constraint},
        notifier, Database, Notifier,
    },
    pricing::{self, Price},
    query::{quote, Quote},
    read::{reservation::Occupied, NextId},
    Query, Service,
};

use super::Command;

/// [`Command`] for creating a new [`Reservation`] along with its [`Invoice`].
#[derive(Clone, Debug)]
pub struct CreateReservation {
    /// ID of a new [`Reservation`].
    ///
    /// Allocated automatically, if [`None`].
    pub id: Option<reservation::Id>,

    /// ID of the [`User`] making a new [`Reservation`].
    pub user_id: Option<user::Id>,

    /// Initial [`reservation::Status`].
    ///
    /// [`Status::Pending`], if [`None`].
    pub status: Option<reservation::Status>,

    /// [`Booking`] details of a new [`Reservation`].
    pub booking: Booking,
}

/// Client-editable details of a [`Reservation`].
#[derive(Clone, Debug)]
pub struct Booking {
    /// Scheduled start of the event.
    pub starts_at: StartDateTime,

    /// Scheduled end of the event.
    pub ends_at: EndDateTime,

    /// Actual end of the event, if it differs from the scheduled one.
    pub effectively_ends_at: Option<EffectiveEndDateTime>,

    /// Number of the reserved seats.
    pub seats: SeatCount,

    /// Category of the event.
    pub event_type: EventType,

    /// Indicator whether the full package is requested.
    pub is_full_package: bool,

    /// Requested [`AddOn`]s.
    ///
    /// [`AddOn`]: crate::domain::AddOn
    pub add_ons: Vec<RequestedAddOn>,

    /// Indicator whether the security deposit is refunded.
    pub is_security_deposit_refunded: bool,

    /// Tax rate applied to the discounted price.
    pub tax_rate: Option<TaxRate>,

    /// [`Discount`] applied to the price.
    pub discount: Option<Discount>,

    /// Way the price was requested to be computed.
    pub price_computation_method: PriceComputationMethod,
}

impl Booking {
    /// Validates the timing of this [`Booking`].
    ///
    /// The start is checked against the provided `now`, if any.
    ///
    /// # Errors
    ///
    /// With the first [`Violation`] found.
    pub fn validate(&self, now: Option<DateTime>) -> Result<(), Violation> {
        availability::validate(
            self.starts_at,
            self.ends_at,
            self.effectively_ends_at,
            now,
        )
    }

    /// Returns the buffered [`reservation::Window`] of this [`Booking`].
    #[must_use]
    pub fn window(&self) -> reservation::Window {
        reservation::Window::buffered(
            self.starts_at,
            self.ends_at,
            self.effectively_ends_at,
        )
    }

    /// Returns [`pricing::Input`] of this [`Booking`].
    #[must_use]
    pub fn pricing_input(&self) -> pricing::Input {
        pricing::Input {
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            effectively_ends_at: self.effectively_ends_at,
            seats: self.seats,
            add_ons: self.add_ons.clone(),
            discount: self.discount.clone(),
            tax_rate: self.tax_rate,
        }
    }

    /// Builds a [`Reservation`] out of this [`Booking`] priced with the
    /// provided [`Price`].
    #[must_use]
    pub fn into_reservation(
        self,
        id: reservation::Id,
        user_id: user::Id,
        status: reservation::Status,
        price: &Price,
    ) -> Reservation {
        Reservation {
            id,
            user_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            effectively_ends_at: self.effectively_ends_at,
            seats: self.seats,
            event_type: self.event_type,
            is_full_package: self.is_full_package,
            add_ons: self.add_ons,
            add_ons_total_cost: price.add_ons_total_cost,
            status,
            is_security_deposit_refunded: self.is_security_deposit_refunded,
            tax_rate: self.tax_rate,
            total_price: price.total,
            rates: price.rates,
            discount: self.discount,
            price_computation_method: self.price_computation_method,
        }
    }
}

impl<Db, Ntf> Command<CreateReservation> for Service<Db, Ntf>
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
            Select<By<reservation::Id, NextId>>,
            Ok = reservation::Id,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Occupied>, reservation::Window>>,
            Ok = Vec<Occupied>,
            Err = Traced<database::Error>,
        > + Database<Insert<rate::Snapshot>, Err = Traced<database::Error>>
        + Database<Insert<Discount>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<
            Select<By<invoice::Id, NextId>>,
            Ok = invoice::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Invoice>, Err = Traced<database::Error>>
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
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReservation {
            id,
            user_id,
            status,
            booking,
        } = cmd;

        let now = DateTime::now();
        booking
            .validate(Some(now))
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let user_id = user_id.ok_or(E::MissingUserId).map_err(tracerr::wrap!())?;
        let user = self
            .database()
            .execute(Select(By::new(user_id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let price = self
            .execute(Quote(booking.pricing_input()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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

        let id = if let Some(id) = id {
            let existing = tx
                .execute(Select(By::<Option<Reservation>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if existing.is_some() {
                return Err(tracerr::new!(E::ReservationExists(id)));
            }
            id
        } else {
            tx.execute(Select(By::<reservation::Id, _>::new(NextId)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
        };

        let window = booking.window();
        let occupied = tx
            .execute(Select(By::new(window)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(taken) = availability::find_conflict(&window, &occupied, None)
        {
            log::debug!("time slot is occupied by `Reservation(id: {taken})`");
            return Err(tracerr::new!(E::SlotOccupied));
        }

        let reservation = booking.into_reservation(
            id,
            user.id.clone(),
            status.unwrap_or(reservation::Status::Pending),
            &price,
        );

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
        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if e.as_ref().is_violation(constraint::RESERVATION_SLOT) {
                    tracerr::new!(E::SlotOccupied)
                } else if e.as_ref().is_violation(constraint::RESERVATION_ID) {
                    tracerr::new!(E::ReservationExists(id))
                } else {
                    e
                }
            })
            .map(drop)?;

        let invoice_id = tx
            .execute(Select(By::<invoice::Id, _>::new(NextId)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let lead_time = self.config().lead_time;
        let mut invoice = Invoice::for_reservation(
            invoice_id,
            &reservation,
            lead_time,
            now.coerce(),
        );
        _ = invoice.escalate_if_near_due(
            reservation.starts_at,
            lead_time,
            now.coerce(),
        );
        tx.execute(Insert(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if e.as_ref().is_violation(constraint::INVOICE_NUMBER) {
                    tracerr::new!(E::InvoiceNumberOccupied(
                        invoice.number.clone()
                    ))
                } else {
                    e
                }
            })
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Reservation(id: {id})` booked for {} - {}, total price {}",
            reservation.starts_at.coerce::<()>().format(),
            reservation.ends_at.coerce::<()>().format(),
            reservation.total_price,
        );

        self.notify([
            Notification::reservation_created(&reservation, &user),
            Notification::invoice_updated(&invoice, &user),
        ])
        .await;

        Ok(reservation)
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
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

    /// [`invoice::Number`] is already occupied.
    #[display("`{_0}` invoice number is occupied")]
    InvoiceNumberOccupied(#[error(not(source))] invoice::Number),

    /// No [`User`] ID provided.
    #[display("`User` ID is required")]
    MissingUserId,

    /// [`Reservation`] with the provided ID already exists.
    #[display("`Reservation(id: {_0})` already exists")]
    ReservationExists(#[error(not(source))] reservation::Id),

    /// Requested time is invalid.
    #[display("{_0}")]
    #[from]
    Schedule(Violation),

    /// Requested time slot overlaps another [`Reservation`].
    #[display("Requested time slot is occupied")]
    SlotOccupied,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

impl ExecutionError {
    /// Checks whether this [`ExecutionError`] is a [`Database`] violation of
    /// the provided `constraint`.
    fn is_violation(&self, constraint: &str) -> bool {
        matches!(
            self,
            Self::Db(e) if e.is_unique_violation(Some(constraint))
                || e.is_exclusion_violation(Some(constraint)),
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
pub(crate) mod spec {
    use std::str::FromStr as _;

    use common::{operations::Insert, DateTime, Money};

    use crate::{
        command::{Command as _, CreateReservation},
        domain::{
            add_on,
            discount::{self, Discount},
            invoice,
            notification::Template,
            reservation::{
                self, EventType, PriceComputationMethod, RequestedAddOn,
                SeatCount,
            },
            user, AddOn, User,
        },
        infra::{
            database::{constraint, Mock},
            notifier::Recorder,
        },
        Config, Service,
    };

    use super::{Booking, ExecutionError};

    pub(crate) fn at(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    pub(crate) fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    pub(crate) fn user() -> User {
        User {
            id: user::Id::new("u-1").unwrap(),
            first_name: user::Name::new("Ana").unwrap(),
            last_name: user::Name::new("Reyes").unwrap(),
            email: user::Email::new("ana@example.com").unwrap(),
        }
    }

    pub(crate) fn booking(start: &str, end: &str, seats: u16) -> Booking {
        Booking {
            starts_at: at(start).coerce(),
            ends_at: at(end).coerce(),
            effectively_ends_at: None,
            seats: SeatCount::new(seats).unwrap(),
            event_type: EventType::Birthday,
            is_full_package: false,
            add_ons: vec![],
            is_security_deposit_refunded: false,
            tax_rate: Some("0.08".parse().unwrap()),
            discount: None,
            price_computation_method: PriceComputationMethod::Auto,
        }
    }

    pub(crate) fn create(id: i64, start: &str, end: &str) -> CreateReservation {
        CreateReservation {
            id: Some(id.into()),
            user_id: Some(user().id),
            status: None,
            booking: booking(start, end, 80),
        }
    }

    pub(crate) fn service(
        notifier: Recorder,
    ) -> (Service<Mock, Recorder>, Mock) {
        let db = Mock::default();
        db.add_user(user());
        (Service::new(Config::default(), db.clone(), notifier), db)
    }

    #[tokio::test]
    async fn books_and_invoices() {
        let notifier = Recorder::default();
        let (service, db) = service(notifier.clone());

        let r = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        assert_eq!(r.total_price, money("1998"));
        assert_eq!(r.status, reservation::Status::Pending);
        assert_eq!(r.rates.facility, money("1500"));
        assert_eq!(r.rates.cleaning, money("150"));

        let stored = db.reservation(r.id).unwrap();
        assert_eq!(stored.total_price, r.total_price);

        let invoice = db.invoice_of(r.id).unwrap();
        assert_eq!(invoice.number.to_string(), "INV-0001");
        assert_eq!(invoice.amount_due, money("1998"));
        assert_eq!(invoice.total_amount_paid, Money::ZERO);
        assert_eq!(invoice.status, invoice::Status::Due);
        assert_eq!(
            invoice.due_at.coerce::<()>().format(),
            "2099-05-25, 06:00 PM",
        );

        assert_eq!(db.locks_count(), 1);
        assert_eq!(
            notifier.templates(),
            [Template::ReservationCreated, Template::InvoiceUpdated],
        );
    }

    #[tokio::test]
    async fn prices_saturday_higher() {
        let (service, _) = service(Recorder::default());

        let r = service
            .execute(create(1, "2099-06-06, 06:00 PM", "2099-06-06, 11:00 PM"))
            .await
            .unwrap();

        assert_eq!(r.total_price, money("2538"));
    }

    #[tokio::test]
    async fn rejects_occupied_slot() {
        let (service, db) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let err = service
            .execute(create(2, "2099-06-01, 08:00 PM", "2099-06-01, 10:00 PM"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SlotOccupied), "{err}");
        assert!(db.reservation(2.into()).is_none());
        assert!(db.invoice_of(2.into()).is_none());
    }

    #[tokio::test]
    async fn books_slot_after_buffer() {
        let (service, _) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        _ = service
            .execute(create(2, "2099-06-02, 03:00 AM", "2099-06-02, 05:00 AM"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_existing_id() {
        let (service, _) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let err = service
            .execute(create(1, "2099-07-01, 06:00 PM", "2099-07-01, 11:00 PM"))
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::ReservationExists(id) if *id == 1.into()),
            "{err}",
        );
    }

    #[tokio::test]
    async fn insert_never_overwrites_stored_reservation() {
        let (service, db) = service(Recorder::default());
        let stored = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let mut duplicate = stored.clone();
        duplicate.total_price = money("1");
        let err = db.execute(Insert(duplicate)).await.unwrap_err();

        assert!(err
            .as_ref()
            .is_unique_violation(Some(constraint::RESERVATION_ID)));
        assert!(
            ExecutionError::Db(err.into_inner())
                .is_violation(constraint::RESERVATION_ID),
        );
        assert_eq!(db.reservation(1.into()).unwrap().total_price, money("1998"));
    }

    #[tokio::test]
    async fn allocates_ids() {
        let (service, db) = service(Recorder::default());
        let mut cmd =
            create(0, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM");
        cmd.id = None;

        let r = service.execute(cmd).await.unwrap();

        assert_eq!(r.id, 1.into());
        assert!(db.invoice_of(r.id).is_some());
    }

    #[tokio::test]
    async fn validates_timing() {
        let (service, _) = service(Recorder::default());

        let err = service
            .execute(create(1, "2001-06-01, 06:00 PM", "2001-06-01, 11:00 PM"))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Schedule(crate::availability::Violation::StartInPast),
            ),
            "{err}",
        );

        let err = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 05:00 PM"))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Schedule(crate::availability::Violation::EndBeforeStart),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn requires_known_user() {
        let (service, _) = service(Recorder::default());

        let mut cmd = create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM");
        cmd.user_id = None;
        let err = service.execute(cmd).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::MissingUserId), "{err}");

        let mut cmd = create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM");
        cmd.user_id = user::Id::new("nobody");
        let err = service.execute(cmd).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::UserNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn requires_known_add_ons() {
        let (service, db) = service(Recorder::default());
        db.add_add_on(AddOn {
            id: 3.into(),
            name: add_on::Name::new("Photo Booth").unwrap(),
            price: money("300"),
        });

        let mut cmd = create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM");
        cmd.booking.add_ons = vec![RequestedAddOn {
            add_on_id: 4.into(),
            quantity: 1,
        }];
        let err = service.execute(cmd).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::AddOnNotExists(id) if *id == 4.into()),
            "{err}",
        );

        let mut cmd = create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM");
        cmd.booking.add_ons = vec![RequestedAddOn {
            add_on_id: 3.into(),
            quantity: 2,
        }];
        let r = service.execute(cmd).await.unwrap();
        assert_eq!(r.add_ons_total_cost, money("600"));
        // (200 + 600 + 1500 + 150) * 1.08
        assert_eq!(r.total_price, money("2646"));
    }

    #[tokio::test]
    async fn interns_snapshots() {
        let (service, db) = service(Recorder::default());
        let discount = Discount {
            value: discount::Value::Amount(money("50")),
            name: discount::Name::new("Spring").unwrap(),
            code: discount::Code::new("SPRING-50").unwrap(),
            is_available: true,
            description: None,
        };

        for (id, day) in [(1, "01"), (2, "08"), (3, "15")] {
            let mut cmd = create(
                id,
                &format!("2099-06-{day}, 06:00 PM"),
                &format!("2099-06-{day}, 11:00 PM"),
            );
            cmd.booking.discount = Some(discount.clone());
            _ = service.execute(cmd).await.unwrap();
        }

        assert_eq!(db.rates_count(), 1);
        assert_eq!(db.discounts_count(), 1);
        assert_eq!(
            db.reservation(1.into()).unwrap().rates.id(),
            db.reservation(3.into()).unwrap().rates.id(),
        );
    }

    #[tokio::test]
    async fn survives_notification_failure() {
        let (service, db) = service(Recorder::failing());

        let r = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        assert!(db.reservation(r.id).is_some());
        assert!(db.invoice_of(r.id).is_some());
    }
}
