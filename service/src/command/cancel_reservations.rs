//! [`Command`] for cancelling multiple [`Reservation`]s at once.

use std::collections::HashMap;

use common::operations::{By, Select};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{reservation, Reservation},
    infra::{database, Database},
    Service,
};

use super::{cancel_reservation, CancelReservation, Command, Outcome};

/// [`Command`] for cancelling multiple [`Reservation`]s at once.
///
/// Every existing [`Reservation`] is cancelled independently of the others,
/// so a failure of one doesn't prevent cancelling the rest. Missing and
/// failed ones are reported in the [`Outcome`].
#[derive(Clone, Debug)]
pub struct CancelReservations {
    /// IDs of the [`Reservation`]s to cancel.
    pub ids: Vec<reservation::Id>,
}

impl<Db, Ntf> Command<CancelReservations> for Service<Db, Ntf>
where
    Db: Database<
        Select<By<HashMap<reservation::Id, Reservation>, Vec<reservation::Id>>>,
        Ok = HashMap<reservation::Id, Reservation>,
        Err = Traced<database::Error>,
    >,
    Self: Command<
        CancelReservation,
        Ok = Reservation,
        Err = Traced<cancel_reservation::ExecutionError>,
    >,
{
    type Ok = Outcome;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CancelReservations { ids }: CancelReservations,
    ) -> Result<Self::Ok, Self::Err> {
        let existing = self
            .database()
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;

        let mut outcome = Outcome::default();
        for id in ids {
            if !existing.contains_key(&id) {
                outcome.failed.push(id);
                continue;
            }
            match self.execute(CancelReservation { id }).await {
                Ok(_) => outcome.succeeded.push(id),
                Err(e) => {
                    log::warn!("failed to cancel `Reservation(id: {id})`: {e}");
                    outcome.failed.push(id);
                }
            }
        }
        outcome.normalize();

        if !outcome.failed.is_empty() {
            log::warn!(
                "{} of the requested reservations were not cancelled",
                outcome.failed.len(),
            );
        }
        Ok(outcome)
    }
}

/// Error of [`CancelReservations`] [`Command`] execution.
pub type ExecutionError = database::Error;

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            create_reservation::spec::{create, service},
            CancelReservations, Command as _,
        },
        domain::{invoice, reservation},
        infra::notifier::Recorder,
    };

    #[tokio::test]
    async fn reports_missing_after_cancelling_rest() {
        let (service, db) = service(Recorder::default());
        _ = service
            .execute(create(10, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let outcome = service
            .execute(CancelReservations {
                ids: vec![10.into(), 11.into()],
            })
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, [reservation::Id::from(10)]);
        assert_eq!(outcome.failed, [reservation::Id::from(11)]);
        assert_eq!(outcome.failed_list(), "11");
        assert_eq!(
            db.reservation(10.into()).unwrap().status,
            reservation::Status::Cancelled,
        );
        assert_eq!(
            db.invoice_of(10.into()).unwrap().status,
            invoice::Status::Withdrawn,
        );
    }

    #[tokio::test]
    async fn names_every_missing_id() {
        let (service, db) = service(Recorder::default());
        for (id, day) in [(1, "01"), (2, "08"), (4, "15")] {
            _ = service
                .execute(create(
                    id,
                    &format!("2099-06-{day}, 06:00 PM"),
                    &format!("2099-06-{day}, 11:00 PM"),
                ))
                .await
                .unwrap();
        }

        let outcome = service
            .execute(CancelReservations {
                ids: [5, 1, 2, 3, 4].into_iter().map(Into::into).collect(),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome.succeeded,
            [1, 2, 4].map(reservation::Id::from),
        );
        assert_eq!(outcome.failed_list(), "3, 5");
        for id in [1, 2, 4] {
            assert_eq!(
                db.reservation(id.into()).unwrap().status,
                reservation::Status::Cancelled,
            );
        }
    }
}
