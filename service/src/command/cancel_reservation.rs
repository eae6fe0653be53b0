//! [`Command`] for cancelling a [`Reservation`].

use common::operations::{
    By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::invoice::Status;
use crate::{
    domain::{reservation, user, Invoice, Notification, Reservation, User},
    infra::{database, notifier, Database, Notifier},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Reservation`].
///
/// Its [`Invoice`] (if any) becomes [`Status::Withdrawn`].
#[derive(Clone, Copy, Debug)]
pub struct CancelReservation {
    /// ID of the [`Reservation`] to cancel.
    pub id: reservation::Id,
}

impl<Db, Ntf> Command<CancelReservation> for Service<Db, Ntf>
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
        CancelReservation { id }: CancelReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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

        reservation.status = reservation::Status::Cancelled;
        tx.execute(Update(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let invoice = tx
            .execute(Select(By::<Option<Invoice>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let invoice = if let Some(mut invoice) = invoice {
            invoice.reflect_status(reservation.status);
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

        log::info!("`Reservation(id: {id})` cancelled");

        self.notify_user(&reservation.user_id, |user| {
            let mut notifications =
                vec![Notification::reservation_cancelled(&reservation, user)];
            notifications.extend(
                invoice.iter().map(|i| Notification::invoice_updated(i, user)),
            );
            notifications
        })
        .await;

        Ok(reservation)
    }
}

/// Error of [`CancelReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            create_reservation::spec::{create, service},
            CancelReservation, Command as _,
        },
        domain::{invoice, notification::Template, reservation},
        infra::notifier::Recorder,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn withdraws_invoice() {
        let notifier = Recorder::default();
        let (service, db) = service(notifier.clone());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let r = service
            .execute(CancelReservation { id: 1.into() })
            .await
            .unwrap();

        assert_eq!(r.status, reservation::Status::Cancelled);
        assert_eq!(
            db.invoice_of(r.id).unwrap().status,
            invoice::Status::Withdrawn,
        );
        assert_eq!(
            notifier.templates()[2..],
            [Template::ReservationCancelled, Template::InvoiceUpdated],
        );
    }

    #[tokio::test]
    async fn frees_slot() {
        let (service, _) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();
        _ = service
            .execute(CancelReservation { id: 1.into() })
            .await
            .unwrap();

        _ = service
            .execute(create(2, "2099-06-01, 08:00 PM", "2099-06-01, 10:00 PM"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn requires_existing_reservation() {
        let (service, _) = service(Recorder::default());

        let err = service
            .execute(CancelReservation { id: 5.into() })
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::ReservationNotExists(id) if *id == 5.into()),
            "{err}",
        );
    }
}
