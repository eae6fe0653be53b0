//! [`Database`]-related implementations.

#[cfg(test)]
pub mod mock;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(test)]
pub use self::mock::Mock;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Names of the storage constraints checked by the [`Database`] callers.
pub mod constraint {
    /// Uniqueness of a reservation ID.
    pub const RESERVATION_ID: &str = "reservations_pkey";

    /// Exclusion of overlapping buffered windows of the occupying
    /// reservations.
    pub const RESERVATION_SLOT: &str = "reservations_buffered_window_excl";

    /// Uniqueness of an invoice number.
    pub const INVOICE_NUMBER: &str = "invoices_number_key";
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    #[cfg(test)]
    /// Uniqueness `constraint` violated in the [`Mock`].
    #[display("`{_0}` constraint is violated")]
    #[from(ignore)]
    Violated(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the uniqueness
    /// `constraint` (or of any uniqueness constraint, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
            #[cfg(test)]
            Self::Violated(c) => constraint.map_or(true, |name| name == *c),
            #[cfg(all(not(feature = "postgres"), not(test)))]
            _ => {
                _ = constraint;
                false
            }
        }
    }

    /// Checks whether this [`Error`] is a violation of the exclusion
    /// `constraint` (or of any exclusion constraint, if [`None`]).
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_exclusion_violation(constraint),
            #[cfg(test)]
            Self::Violated(_) => false,
            #[cfg(all(not(feature = "postgres"), not(test)))]
            _ => {
                _ = constraint;
                false
            }
        }
    }
}
