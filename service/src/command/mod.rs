//! [`Command`] definition.

pub mod cancel_reservation;
pub mod cancel_reservations;
pub mod create_receipt;
pub mod create_reservation;
pub mod restore_reservation;
pub mod restore_reservations;
pub mod update_reservation;
pub mod update_reservation_status;

use itertools::Itertools as _;

use crate::domain::reservation;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    cancel_reservation::CancelReservation,
    cancel_reservations::CancelReservations, create_receipt::CreateReceipt,
    create_reservation::CreateReservation,
    restore_reservation::RestoreReservation,
    restore_reservations::RestoreReservations,
    update_reservation::UpdateReservation,
    update_reservation_status::UpdateReservationStatus,
};

/// Outcome of a [`Command`] applied to multiple [`Reservation`]s
/// independently.
///
/// [`Reservation`]: crate::domain::Reservation
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outcome {
    /// IDs the [`Command`] succeeded for.
    pub succeeded: Vec<reservation::Id>,

    /// Sorted IDs the [`Command`] failed for, including the non-existing
    /// ones.
    pub failed: Vec<reservation::Id>,
}

impl Outcome {
    /// Returns [`Outcome::failed`] IDs as a comma-separated list.
    #[must_use]
    pub fn failed_list(&self) -> String {
        self.failed.iter().join(", ")
    }

    /// Sorts and deduplicates [`Outcome::failed`] IDs.
    fn normalize(&mut self) {
        self.failed.sort_unstable();
        self.failed.dedup();
    }
}
