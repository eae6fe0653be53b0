//! [`Command`] for restoring a [`Reservation`] to some [`reservation::Status`].

use common::{
    operations::{
        By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::invoice::Status;
use crate::{
    availability,
    domain::{reservation, user, Invoice, Notification, Reservation, User},
    infra::{
        database::{self, constraint},
        notifier, Database, Notifier,
    },
    read::reservation::Occupied,
    Service,
};

use super::Command;

/// [`Command`] for restoring a [`Reservation`] to the provided
/// [`reservation::Status`].
///
/// Its [`Invoice`] (if any) becomes [`Status::Due`] again. A
/// [`Reservation`] cannot be restored to the
/// [`reservation::Status::Cancelled`] one.
#[derive(Clone, Copy, Debug)]
pub struct RestoreReservation {
    /// ID of the [`Reservation`] to restore.
    pub id: reservation::Id,

    /// [`reservation::Status`] to restore the [`Reservation`] to.
    pub status: reservation::Status,
}

impl<Db, Ntf> Command<RestoreReservation> for Service<Db, Ntf>
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
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        RestoreReservation { id, status }: RestoreReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        if status == reservation::Status::Cancelled {
            return Err(tracerr::new!(E::NotRestorable(status)));
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
        reservation.status = status;
        if !was_occupying && reservation.is_occupying() {
            let window = reservation.window();
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

        let invoice = tx
            .execute(Select(By::<Option<Invoice>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let invoice = if let Some(mut invoice) = invoice {
            invoice.reflect_status(reservation.status);
            _ = invoice.escalate_if_near_due(
                reservation.starts_at,
                self.config().lead_time,
                DateTime::now().coerce(),
            );
            tx.execute(Update(invoice.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            Some(invoice)
        } else {
            None
        };

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Reservation(id: {id})` restored to `{status}`");

        self.notify_user(&reservation.user_id, |user| {
            let mut notifications =
                vec![Notification::reservation_restored(&reservation, user)];
            notifications.extend(
                invoice.iter().map(|i| Notification::invoice_updated(i, user)),
            );
            notifications
        })
        .await;

        Ok(reservation)
    }
}

/// Error of [`RestoreReservation`] [`Command`] execution.
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
