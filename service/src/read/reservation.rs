//! [`Reservation`]-related read definitions.

use crate::domain::{reservation, Reservation};

/// [`Reservation`] occupying the venue calendar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Occupied {
    /// ID of the [`Reservation`].
    pub id: reservation::Id,

    /// Buffered [`reservation::Window`] the [`Reservation`] occupies.
    pub window: reservation::Window,
}

impl From<&Reservation> for Occupied {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id,
            window: r.window(),
        }
    }
}
