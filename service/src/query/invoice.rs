//! [`Query`] collection related to a single [`Invoice`].

use common::operations::By;

use crate::domain::{invoice, reservation, Invoice};
#[cfg(doc)]
use crate::{domain::Reservation, Query};

use super::DatabaseQuery;

/// Queries an [`Invoice`] by its [`invoice::Id`].
pub type ById = DatabaseQuery<By<Option<Invoice>, invoice::Id>>;

/// Queries an [`Invoice`] by the [`reservation::Id`] of its [`Reservation`].
pub type ByReservationId = DatabaseQuery<By<Option<Invoice>, reservation::Id>>;
