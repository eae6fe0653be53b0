//! [`Command`] for restoring multiple [`Reservation`]s at once.

use std::collections::HashMap;

use common::operations::{By, Select};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::reservation::Status;
use crate::{
    domain::{reservation, Reservation},
    infra::{database, Database},
    Service,
};

use super::{restore_reservation, Command, Outcome, RestoreReservation};

/// [`Command`] for restoring multiple [`Reservation`]s to
/// [`Status::Pending`] at once.
///
/// Every existing [`Reservation`] is restored independently of the others,
/// so a failure of one doesn't prevent restoring the rest. Missing and
/// failed ones are reported in the [`Outcome`].
#[derive(Clone, Debug)]
pub struct RestoreReservations {
    /// IDs of the [`Reservation`]s to restore.
    pub ids: Vec<reservation::Id>,
}

impl<Db, Ntf> Command<RestoreReservations> for Service<Db, Ntf>
where
    Db: Database<
        Select<By<HashMap<reservation::Id, Reservation>, Vec<reservation::Id>>>,
        Ok = HashMap<reservation::Id, Reservation>,
        Err = Traced<database::Error>,
    >,
    Self: Command<
        RestoreReservation,
        Ok = Reservation,
        Err = Traced<restore_reservation::ExecutionError>,
    >,
{
    type Ok = Outcome;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        RestoreReservations { ids }: RestoreReservations,
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
            let cmd = RestoreReservation {
                id,
                status: reservation::Status::Pending,
            };
            match self.execute(cmd).await {
                Ok(_) => outcome.succeeded.push(id),
                Err(e) => {
                    log::warn!("failed to restore `Reservation(id: {id})`: {e}");
                    outcome.failed.push(id);
                }
            }
        }
        outcome.normalize();

        if !outcome.failed.is_empty() {
            log::warn!(
                "{} of the requested reservations were not restored",
                outcome.failed.len(),
            );
        }
        Ok(outcome)
    }
}

/// Error of [`RestoreReservations`] [`Command`] execution.
pub type ExecutionError = database::Error;
