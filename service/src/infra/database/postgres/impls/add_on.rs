//! [`AddOn`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{add_on, AddOn},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds an [`AddOn`] out of the provided [`Row`].
fn from_row(row: &Row) -> AddOn {
    AddOn {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<add_on::Id, AddOn>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[add_on::Id]>,
{
    type Ok = HashMap<add_on::Id, AddOn>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<add_on::Id, AddOn>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[add_on::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, name, price \
            FROM add_ons \
            WHERE id IN (SELECT unnest($1::INT8[]))";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(|a| (a.id, a))
            .collect())
    }
}

impl<C, Names> Database<Select<By<HashMap<add_on::Name, AddOn>, Names>>>
    for Postgres<C>
where
    C: Connection,
    Names: AsRef<[add_on::Name]>,
{
    type Ok = HashMap<add_on::Name, AddOn>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<add_on::Name, AddOn>, Names>>,
    ) -> Result<Self::Ok, Self::Err> {
        let names = by.into_inner();
        // Avoid subtle change for SQL.
        let names: &[add_on::Name] = names.as_ref();
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        // The latest entry wins if a name is duplicated in the catalog.
        const SQL: &str = "\
            SELECT DISTINCT ON (name) id, name, price \
            FROM add_ons \
            WHERE name IN (SELECT unnest($1::TEXT[])) \
            ORDER BY name, id DESC";
        Ok(self
            .query(SQL, &[&names])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(|a| (a.name.clone(), a))
            .collect())
    }
}
