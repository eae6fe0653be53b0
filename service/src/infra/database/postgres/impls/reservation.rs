//! [`Reservation`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        add_on, discount, rate,
        reservation::{self, RequestedAddOn, SeatCount},
        Discount, Reservation,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{reservation::Occupied, NextId},
};

/// Key of the advisory lock guarding the venue [`reservation::Calendar`].
const CALENDAR_LOCK_KEY: i64 = 0x5265_7365_7276;

/// Builds a [`Reservation`] out of the provided [`Row`] and its
/// [`RequestedAddOn`]s.
fn from_row(row: &Row, add_ons: Vec<RequestedAddOn>) -> Reservation {
    let discount = row
        .get::<_, Option<discount::Kind>>("discount_kind")
        .map(|kind| Discount {
            value: match kind {
                discount::Kind::Percentage => {
                    discount::Value::Percentage(row.get("discount_percentage"))
                }
                discount::Kind::Amount => {
                    discount::Value::Amount(row.get("discount_amount"))
                }
            },
            name: row.get("discount_name"),
            code: row.get("discount_code"),
            is_available: row.get("discount_is_available"),
            description: row.get("discount_description"),
        });

    Reservation {
        id: row.get("id"),
        user_id: row.get("user_id"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        effectively_ends_at: row.get("effectively_ends_at"),
        seats: u16::try_from(row.get::<_, i16>("seats"))
            .ok()
            .and_then(SeatCount::new)
            .expect("`seats` overflow"),
        event_type: row.get("event_type"),
        is_full_package: row.get("is_full_package"),
        add_ons,
        add_ons_total_cost: row.get("add_ons_total_cost"),
        status: row.get("status"),
        is_security_deposit_refunded: row.get("is_security_deposit_refunded"),
        tax_rate: row.get("tax_rate"),
        total_price: row.get("total_price"),
        rates: rate::Snapshot {
            seat: row.get("rate_seat"),
            facility: row.get("rate_facility"),
            overtime: row.get("rate_overtime"),
            cleaning: row.get("rate_cleaning"),
        },
        discount,
        price_computation_method: row.get("price_computation_method"),
    }
}

impl<C> Database<Select<By<reservation::Id, NextId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = reservation::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<reservation::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('reservations_id_seq') AS id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map(|row| row.get("id"))
            .expect("`nextval()` always returns a row"))
    }
}

impl<C, IDs> Database<Select<By<HashMap<reservation::Id, Reservation>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[reservation::Id]>,
{
    type Ok = HashMap<reservation::Id, Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<reservation::Id, Reservation>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[reservation::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap();

        const ADD_ONS_SQL: &str = "\
            SELECT reservation_id, add_on_id, quantity \
            FROM reservation_add_ons \
            WHERE reservation_id IN (SELECT unnest($1::INT8[])) \
            ORDER BY reservation_id, position";
        let mut add_ons = self
            .query(ADD_ONS_SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                (
                    row.get::<_, reservation::Id>("reservation_id"),
                    RequestedAddOn {
                        add_on_id: row.get::<_, add_on::Id>("add_on_id"),
                        quantity: u16::try_from(row.get::<_, i32>("quantity"))
                            .expect("`quantity` overflow"),
                    },
                )
            })
            .into_group_map();

        const SQL: &str = "\
            SELECT r.id, r.user_id, \
                   r.starts_at, r.ends_at, r.effectively_ends_at, \
                   r.seats, r.event_type, r.is_full_package, \
                   r.add_ons_total_cost, r.status, \
                   r.is_security_deposit_refunded, r.tax_rate, \
                   r.total_price, r.price_computation_method, \
                   rt.seat AS rate_seat, \
                   rt.facility AS rate_facility, \
                   rt.overtime AS rate_overtime, \
                   rt.cleaning AS rate_cleaning, \
                   d.kind AS discount_kind, \
                   d.percentage AS discount_percentage, \
                   d.amount AS discount_amount, \
                   d.name AS discount_name, \
                   d.code AS discount_code, \
                   d.is_available AS discount_is_available, \
                   d.description AS discount_description \
            FROM reservations AS r \
            INNER JOIN rates AS rt ON rt.id = r.rates_id \
            LEFT JOIN discounts AS d ON d.id = r.discount_id \
            WHERE r.id IN (SELECT unnest($1::INT8[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id: reservation::Id = row.get("id");
                let add_ons = add_ons.remove(&id).unwrap_or_default();
                (id, from_row(&row, add_ons))
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<reservation::Id, Reservation>, [reservation::Id; 1]>>,
        Ok = HashMap<reservation::Id, Reservation>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Vec<Occupied>, reservation::Window>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Occupied>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Occupied>, reservation::Window>>,
    ) -> Result<Self::Ok, Self::Err> {
        let reservation::Window { starts_at, ends_at } = by.into_inner();
        let cancelled = reservation::Status::Cancelled;

        const SQL: &str = "\
            SELECT id, buffered_starts_at, buffered_ends_at \
            FROM reservations \
            WHERE status <> $3::INT2 \
              AND tstzrange(buffered_starts_at, buffered_ends_at) \
                  && tstzrange($1::TIMESTAMPTZ, $2::TIMESTAMPTZ) \
            ORDER BY buffered_starts_at";
        Ok(self
            .query(SQL, &[&starts_at, &ends_at, &cancelled])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Occupied {
                id: row.get("id"),
                window: reservation::Window {
                    starts_at: row.get("buffered_starts_at"),
                    ends_at: row.get("buffered_ends_at"),
                },
            })
            .collect())
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO reservations (\
                id, user_id, \
                starts_at, ends_at, effectively_ends_at, \
                buffered_starts_at, buffered_ends_at, \
                seats, event_type, is_full_package, \
                add_ons_total_cost, status, \
                is_security_deposit_refunded, tax_rate, total_price, \
                rates_id, discount_id, price_computation_method\
            ) VALUES (\
                $1::INT8, $2::TEXT, \
                $3::TIMESTAMPTZ, $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ, \
                $8::INT2, $9::INT2, $10::BOOLEAN, \
                $11::NUMERIC, $12::INT2, \
                $13::BOOLEAN, $14::NUMERIC, $15::NUMERIC, \
                $16::UUID, $17::UUID, $18::INT2\
            )";
        save(self, SQL, reservation).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE reservations \
            SET user_id = $2::TEXT, \
                starts_at = $3::TIMESTAMPTZ, \
                ends_at = $4::TIMESTAMPTZ, \
                effectively_ends_at = $5::TIMESTAMPTZ, \
                buffered_starts_at = $6::TIMESTAMPTZ, \
                buffered_ends_at = $7::TIMESTAMPTZ, \
                seats = $8::INT2, \
                event_type = $9::INT2, \
                is_full_package = $10::BOOLEAN, \
                add_ons_total_cost = $11::NUMERIC, \
                status = $12::INT2, \
                is_security_deposit_refunded = $13::BOOLEAN, \
                tax_rate = $14::NUMERIC, \
                total_price = $15::NUMERIC, \
                rates_id = $16::UUID, \
                discount_id = $17::UUID, \
                price_computation_method = $18::INT2 \
            WHERE id = $1::INT8";
        save(self, SQL, reservation).await.map_err(tracerr::wrap!())
    }
}

/// Writes the provided [`Reservation`] with the given `sql` statement, taking
/// its fields as `$1..$18` parameters, and replaces its [`RequestedAddOn`]s.
async fn save<C: Connection>(
    db: &Postgres<C>,
    sql: &str,
    reservation: Reservation,
) -> Result<(), Traced<database::Error>> {
    let window = reservation.window();
    let Reservation {
        id,
        user_id,
        starts_at,
        ends_at,
        effectively_ends_at,
        seats,
        event_type,
        is_full_package,
        add_ons,
        add_ons_total_cost,
        status,
        is_security_deposit_refunded,
        tax_rate,
        total_price,
        rates,
        discount,
        price_computation_method,
    } = reservation;
    let seats = i16::try_from(seats.get()).expect("`seats` overflow");
    let rates_id = rates.id();
    let discount_id = discount.as_ref().map(Discount::id);

    db.exec(
        sql,
        &[
            &id,
            &user_id,
            &starts_at,
            &ends_at,
            &effectively_ends_at,
            &window.starts_at,
            &window.ends_at,
            &seats,
            &event_type,
            &is_full_package,
            &add_ons_total_cost,
            &status,
            &is_security_deposit_refunded,
            &tax_rate,
            &total_price,
            &rates_id,
            &discount_id,
            &price_computation_method,
        ],
    )
    .await
    .map_err(tracerr::wrap!())?;

    const DELETE_ADD_ONS_SQL: &str = "\
        DELETE FROM reservation_add_ons \
        WHERE reservation_id = $1::INT8";
    db.exec(DELETE_ADD_ONS_SQL, &[&id])
        .await
        .map_err(tracerr::wrap!())?;

    if add_ons.is_empty() {
        return Ok(());
    }
    let (add_on_ids, quantities): (Vec<add_on::Id>, Vec<i32>) = add_ons
        .iter()
        .map(|a| (a.add_on_id, i32::from(a.quantity)))
        .unzip();

    const INSERT_ADD_ONS_SQL: &str = "\
        INSERT INTO reservation_add_ons (\
            reservation_id, position, add_on_id, quantity\
        ) \
        SELECT $1::INT8, a.position::INT2, a.add_on_id, a.quantity \
        FROM unnest($2::INT8[], $3::INT4[]) \
             WITH ORDINALITY AS a(add_on_id, quantity, position)";
    db.exec(INSERT_ADD_ONS_SQL, &[&id, &add_on_ids, &quantities])
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
}

impl<C> Database<Lock<By<Reservation, reservation::Calendar>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Reservation, reservation::Calendar>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Released automatically once the transaction ends.
        const SQL: &str = "SELECT pg_advisory_xact_lock($1::INT8)";
        self.exec(SQL, &[&CALENDAR_LOCK_KEY])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
