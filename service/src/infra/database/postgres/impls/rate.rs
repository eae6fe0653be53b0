//! [`rate::Snapshot`]- and [`Discount`]-related [`Database`]
//! implementations.

use common::operations::Insert;
use tracerr::Traced;

use crate::{
    domain::{discount, rate, Discount},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<rate::Snapshot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(rates): Insert<rate::Snapshot>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = rates.id();
        let rate::Snapshot {
            seat,
            facility,
            overtime,
            cleaning,
        } = rates;

        // Snapshots are content-addressed, so an existing row is the same.
        const SQL: &str = "\
            INSERT INTO rates (id, seat, facility, overtime, cleaning) \
            VALUES ($1::UUID, $2::NUMERIC, $3::NUMERIC, \
                    $4::NUMERIC, $5::NUMERIC) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(SQL, &[&id, &seat, &facility, &overtime, &cleaning])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Insert<Discount>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(d): Insert<Discount>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = d.id();
        let kind = d.value.kind();
        let (percentage, amount) = match d.value {
            discount::Value::Percentage(p) => (Some(p), None),
            discount::Value::Amount(a) => (None, Some(a)),
        };

        const SQL: &str = "\
            INSERT INTO discounts (id, kind, percentage, amount, \
                                   name, code, is_available, description) \
            VALUES ($1::UUID, $2::INT2, $3::NUMERIC, $4::NUMERIC, \
                    $5::TEXT, $6::TEXT, $7::BOOLEAN, $8::TEXT) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(
            SQL,
            &[
                &id,
                &kind,
                &percentage,
                &amount,
                &d.name,
                &d.code,
                &d.is_available,
                &d.description,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
