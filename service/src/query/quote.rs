//! [`Quote`] [`Query`].

use std::collections::HashMap;

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{add_on, rate, AddOn},
    infra::{database, Database},
    pricing::{self, Price},
    Service,
};

use super::Query;

/// [`Query`] previewing the [`Price`] of a reservation without storing
/// anything.
///
/// Rates are resolved from the add-on catalog overrides falling back to the
/// configured defaults.
#[derive(Clone, Debug)]
pub struct Quote(pub pricing::Input);

impl<Db, Ntf> Query<Quote> for Service<Db, Ntf>
where
    Db: Database<
            Select<By<HashMap<add_on::Name, AddOn>, Vec<add_on::Name>>>,
            Ok = HashMap<add_on::Name, AddOn>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<add_on::Id, AddOn>, Vec<add_on::Id>>>,
            Ok = HashMap<add_on::Id, AddOn>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Price;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, Quote(input): Quote) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let overrides = self
            .database()
            .execute(Select(By::new(rate::Overrides::catalog_names())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let rates = rate::Table::resolve(
            &rate::Overrides::from_catalog(overrides.values()),
            &self.config().rates,
        );

        let ids: Vec<add_on::Id> =
            input.add_ons.iter().map(|a| a.add_on_id).collect();
        let catalog: HashMap<add_on::Id, AddOn> = self
            .database()
            .execute(Select(By::new(ids)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        pricing::compute(&input, &rates, &catalog)
            .map_err(|pricing::Error::AddOnNotExists(id)| E::AddOnNotExists(id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`Quote`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`AddOn`] with the provided ID does not exist.
    #[display("`AddOn(id: {_0})` does not exist")]
    AddOnNotExists(#[error(not(source))] add_on::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
