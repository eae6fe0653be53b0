//! [`Receipt`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{
        invoice,
        receipt::{self, payment},
        Payment, Receipt,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::NextId,
};

impl<C> Database<Select<By<receipt::Id, NextId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = receipt::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<receipt::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('receipts_id_seq') AS id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map(|row| row.get("id"))
            .expect("`nextval()` always returns a row"))
    }
}

impl<C> Database<Select<By<payment::Id, NextId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = payment::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<payment::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('payments_id_seq') AS id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map(|row| row.get("id"))
            .expect("`nextval()` always returns a row"))
    }
}

impl<C> Database<Select<By<Vec<Receipt>, invoice::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Receipt>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Receipt>, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let invoice_id: invoice::Id = by.into_inner();

        const PAYMENTS_SQL: &str = "\
            SELECT p.id, p.receipt_id, p.method, p.amount, \
                   p.card_last_four, p.other_details \
            FROM payments AS p \
            INNER JOIN receipts AS r ON r.id = p.receipt_id \
            WHERE r.invoice_id = $1::INT8 \
            ORDER BY p.id";
        let mut payments = self
            .query(PAYMENTS_SQL, &[&invoice_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let p = Payment {
                    id: row.get("id"),
                    receipt_id: row.get("receipt_id"),
                    method: row.get("method"),
                    amount: row.get("amount"),
                    card_last_four: row.get("card_last_four"),
                    other_details: row.get("other_details"),
                };
                (p.receipt_id, p)
            })
            .into_group_map();

        const SQL: &str = "\
            SELECT id, number, issued_at, amount_paid, \
                   reservation_id, user_id, invoice_id, \
                   total_amount_paid_till_today, paid_by, paid_at, \
                   prev_balance, balance_due, cashier_name \
            FROM receipts \
            WHERE invoice_id = $1::INT8 \
            ORDER BY id";
        Ok(self
            .query(SQL, &[&invoice_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id: receipt::Id = row.get("id");
                Receipt {
                    id,
                    number: row.get("number"),
                    issued_at: row.get("issued_at"),
                    amount_paid: row.get("amount_paid"),
                    reservation_id: row.get("reservation_id"),
                    user_id: row.get("user_id"),
                    invoice_id: row.get("invoice_id"),
                    payments: payments.remove(&id).unwrap_or_default(),
                    total_amount_paid_till_today: row
                        .get("total_amount_paid_till_today"),
                    paid_by: row.get("paid_by"),
                    paid_at: row.get("paid_at"),
                    prev_balance: row.get("prev_balance"),
                    balance_due: row.get("balance_due"),
                    cashier_name: row.get("cashier_name"),
                }
            })
            .collect())
    }
}

impl<C> Database<Insert<Receipt>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(receipt): Insert<Receipt>,
    ) -> Result<Self::Ok, Self::Err> {
        let Receipt {
            id,
            number,
            issued_at,
            amount_paid,
            reservation_id,
            user_id,
            invoice_id,
            payments,
            total_amount_paid_till_today,
            paid_by,
            paid_at,
            prev_balance,
            balance_due,
            cashier_name,
        } = receipt;

        const SQL: &str = "\
            INSERT INTO receipts (\
                id, number, issued_at, amount_paid, \
                reservation_id, user_id, invoice_id, \
                total_amount_paid_till_today, paid_by, paid_at, \
                prev_balance, balance_due, cashier_name\
            ) VALUES (\
                $1::INT8, $2::TEXT, $3::TIMESTAMPTZ, $4::NUMERIC, \
                $5::INT8, $6::TEXT, $7::INT8, \
                $8::NUMERIC, $9::TEXT, $10::TIMESTAMPTZ, \
                $11::NUMERIC, $12::NUMERIC, $13::TEXT\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &number,
                &issued_at,
                &amount_paid,
                &reservation_id,
                &user_id,
                &invoice_id,
                &total_amount_paid_till_today,
                &paid_by,
                &paid_at,
                &prev_balance,
                &balance_due,
                &cashier_name,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        const PAYMENT_SQL: &str = "\
            INSERT INTO payments (\
                id, receipt_id, method, amount, card_last_four, other_details\
            ) VALUES (\
                $1::INT8, $2::INT8, $3::INT2, $4::NUMERIC, $5::TEXT, $6::TEXT\
            )";
        for p in payments {
            self.exec(
                PAYMENT_SQL,
                &[
                    &p.id,
                    &p.receipt_id,
                    &p.method,
                    &p.amount,
                    &p.card_last_four,
                    &p.other_details,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        }
        Ok(())
    }
}
