//! [`Command`] for applying a status [`Action`] to a [`Reservation`].

use common::operations::{
    By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    availability,
    domain::{
        reservation::{self, Action},
        user, Notification, Reservation, User,
    },
    infra::{
        database::{self, constraint},
        notifier, Database, Notifier,
    },
    read::reservation::Occupied,
    Service,
};

use super::{
    cancel_reservation, restore_reservation, CancelReservation, Command,
    RestoreReservation,
};

/// [`Command`] for applying a status [`Action`] to a [`Reservation`].
///
/// [`Action::Cancel`] and the restoring [`Action`]s are routed to the
/// [`CancelReservation`] and [`RestoreReservation`] [`Command`]s
/// respectively. Any other [`Action`] sets its target status only.
#[derive(Clone, Copy, Debug)]
pub struct UpdateReservationStatus {
    /// ID of the [`Reservation`] to apply the [`Action`] to.
    pub id: reservation::Id,

    /// [`Action`] to apply.
    pub action: Action,
}

impl<Db, Ntf> Command<UpdateReservationStatus> for Service<Db, Ntf>
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
        > + Database<Update<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Notify<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
    Self: Command<
            CancelReservation,
            Ok = Reservation,
            Err = Traced<cancel_reservation::ExecutionError>,
        > + Command<
            RestoreReservation,
            Ok = Reservation,
            Err = Traced<restore_reservation::ExecutionError>,
        >,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        UpdateReservationStatus { id, action }: UpdateReservationStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        match action {
            Action::Cancel => {
                return self
                    .execute(CancelReservation { id })
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E));
            }
            Action::RestoreToBooked | Action::RestoreToPending => {
                return self
                    .execute(RestoreReservation {
                        id,
                        status: action.target(),
                    })
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E));
            }
            Action::Approve
            | Action::Confirm
            | Action::MarkAsDone
            | Action::MarkAsSettled => {}
        }

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

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(id))
            .map_err(tracerr::wrap!())?;

        let was_occupying = reservation.is_occupying();
        reservation.status = action.target();
        if !was_occupying {
            let window = reservation.window();
            let occupied = tx
                .execute(Select(By::new(window)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if availability::find_conflict(&window, &occupied, Some(id))
                .is_some()
            {
                return Err(tracerr::new!(E::SlotOccupied));
            }
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
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Reservation(id: {id})` is `{}` after `{action}`",
            reservation.status,
        );

        self.notify_user(&reservation.user_id, |user| {
            vec![Notification::status_changed(&reservation, user)]
        })
        .await;

        Ok(reservation)
    }
}

/// Error of [`UpdateReservationStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] cannot be restored to the provided
    /// [`reservation::Status`].
    #[display("`Reservation` cannot be restored to `{_0}`")]
    NotRestorable(#[error(not(source))] reservation::Status),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Time slot of the [`Reservation`] is occupied by another one.
    #[display("Requested time slot is occupied")]
    SlotOccupied,
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

impl From<cancel_reservation::ExecutionError> for ExecutionError {
    fn from(e: cancel_reservation::ExecutionError) -> Self {
        use cancel_reservation::ExecutionError as E;

        match e {
            E::Db(e) => Self::Db(e),
            E::ReservationNotExists(id) => Self::ReservationNotExists(id),
        }
    }
}

impl From<restore_reservation::ExecutionError> for ExecutionError {
    fn from(e: restore_reservation::ExecutionError) -> Self {
        use restore_reservation::ExecutionError as E;

        match e {
            E::Db(e) => Self::Db(e),
            E::NotRestorable(status) => Self::NotRestorable(status),
            E::ReservationNotExists(id) => Self::ReservationNotExists(id),
            E::SlotOccupied => Self::SlotOccupied,
        }
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            create_reservation::spec::{create, service},
            Command as _, UpdateReservationStatus,
        },
        domain::{
            invoice, notification::Template, reservation,
            reservation::Action,
        },
        infra::notifier::Recorder,
    };

    use super::ExecutionError;

    fn apply(id: i64, action: &str) -> UpdateReservationStatus {
        UpdateReservationStatus {
            id: id.into(),
            action: Action::parse(action).unwrap(),
        }
    }

    #[tokio::test]
    async fn transitions_and_notifies() {
        let notifier = Recorder::default();
        let (service, db) = service(notifier.clone());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        for (action, status) in [
            ("Approve", reservation::Status::Booked),
            ("Confirm", reservation::Status::Confirmed),
            ("Mark as Done", reservation::Status::Done),
            ("Mark as Settled", reservation::Status::Settled),
        ] {
            let r = service.execute(apply(1, action)).await.unwrap();
            assert_eq!(r.status, status, "{action}");
        }

        assert_eq!(
            db.reservation(1.into()).unwrap().status,
            reservation::Status::Settled,
        );
        assert_eq!(db.invoice_of(1.into()).unwrap().status, invoice::Status::Due);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 6);
        assert!(sent[2..]
            .iter()
            .all(|n| n.template == Template::ReservationStatusChanged));
        assert_eq!(sent[2].subject, "Reservation Approved");
        assert_eq!(sent[5].subject, "Reservation Settled");
    }

    #[tokio::test]
    async fn routes_cancel_and_restore() {
        let (service, db) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let r = service.execute(apply(1, "cancel")).await.unwrap();
        assert_eq!(r.status, reservation::Status::Cancelled);
        assert_eq!(
            db.invoice_of(1.into()).unwrap().status,
            invoice::Status::Withdrawn,
        );

        let r = service.execute(apply(1, "Restore to Booked")).await.unwrap();
        assert_eq!(r.status, reservation::Status::Booked);
        assert_eq!(db.invoice_of(1.into()).unwrap().status, invoice::Status::Due);
    }

    #[tokio::test]
    async fn requires_existing_reservation() {
        let (service, _) = service(Recorder::default());

        for action in ["Approve", "Cancel", "Restore to Pending"] {
            let err = service.execute(apply(3, action)).await.unwrap_err();
            assert!(
                matches!(err.as_ref(), ExecutionError::ReservationNotExists(_)),
                "{action}: {err}",
            );
        }
    }
}
