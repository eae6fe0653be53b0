//! [`Invoice`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{invoice, reservation, Invoice},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::NextId,
};

/// Builds an [`Invoice`] out of the provided [`Row`].
fn from_row(row: &Row) -> Invoice {
    Invoice {
        id: row.get("id"),
        number: row.get("number"),
        reservation_id: row.get("reservation_id"),
        user_id: row.get("user_id"),
        issued_at: row.get("issued_at"),
        due_at: row.get("due_at"),
        amount_due: row.get("amount_due"),
        total_amount_paid: row.get("total_amount_paid"),
        status: row.get("status"),
    }
}

impl<C> Database<Select<By<invoice::Id, NextId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = invoice::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<invoice::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('invoices_id_seq') AS id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map(|row| row.get("id"))
            .expect("`nextval()` always returns a row"))
    }
}

impl<C> Database<Select<By<Option<Invoice>, invoice::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: invoice::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, number, reservation_id, user_id, \
                   issued_at, due_at, amount_due, total_amount_paid, status \
            FROM invoices \
            WHERE id = $1::INT8 \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Option<Invoice>, reservation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let reservation_id: reservation::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, number, reservation_id, user_id, \
                   issued_at, due_at, amount_due, total_amount_paid, status \
            FROM invoices \
            WHERE reservation_id = $1::INT8 \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&reservation_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Invoice>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Invoice>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(invoice): Insert<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(invoice)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Invoice>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(invoice): Update<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        let Invoice {
            id,
            number,
            reservation_id,
            user_id,
            issued_at,
            due_at,
            amount_due,
            total_amount_paid,
            status,
        } = invoice;

        const SQL: &str = "\
            INSERT INTO invoices (\
                id, number, reservation_id, user_id, \
                issued_at, due_at, amount_due, total_amount_paid, status\
            ) VALUES (\
                $1::INT8, $2::TEXT, $3::INT8, $4::TEXT, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::NUMERIC, $8::NUMERIC, $9::INT2\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET number = EXCLUDED.number, \
                due_at = EXCLUDED.due_at, \
                amount_due = EXCLUDED.amount_due, \
                total_amount_paid = EXCLUDED.total_amount_paid, \
                status = EXCLUDED.status";
        self.exec(
            SQL,
            &[
                &id,
                &number,
                &reservation_id,
                &user_id,
                &issued_at,
                &due_at,
                &amount_due,
                &total_amount_paid,
                &status,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Invoice, invoice::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Invoice, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: invoice::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM invoices \
            WHERE id = $1::INT8 \
            FOR UPDATE";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
