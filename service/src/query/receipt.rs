//! [`Query`] collection related to [`Receipt`]s.

use common::operations::By;

use crate::domain::{invoice, Receipt};
#[cfg(doc)]
use crate::{domain::Invoice, Query};

use super::DatabaseQuery;

/// Queries all the [`Receipt`]s issued for an [`Invoice`], ordered by their
/// IDs.
pub type ByInvoiceId = DatabaseQuery<By<Vec<Receipt>, invoice::Id>>;
