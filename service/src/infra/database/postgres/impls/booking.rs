//! [`Booking`]-related [`Database`] implementations.

use common::operations::{Bounded, By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, Booking},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `bookings` table in the order [`from_row()`] expects them.
const COLUMNS: &str = "\
    id, plot_id, client_id, \
    kind, booked_area, total_price, \
    status, created_at";

/// Restores a [`Booking`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Booking {
    Booking {
        id: row.get("id"),
        plot_id: row.get("plot_id"),
        client_id: row.get("client_id"),
        allocation: booking::Allocation::from_parts(
            row.get("kind"),
            row.get("booked_area"),
        )
        .expect("`bookings_area_matches_kind` constraint"),
        total_price: row.get("total_price"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Booking>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings \
             WHERE id = $1::UUID"
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let Booking {
            id,
            plot_id,
            client_id,
            allocation,
            total_price,
            status,
            created_at,
        } = booking;

        let sql = format!(
            "INSERT INTO bookings ({COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::UUID, $3::UUID, \
                 $4::INT2, $5::NUMERIC, $6::NUMERIC, \
                 $7::INT2, $8::TIMESTAMPTZ\
             )"
        );
        self.exec(
            &sql,
            &[
                &id,
                &plot_id,
                &client_id,
                &allocation.kind(),
                &allocation.area(),
                &total_price,
                &status,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

/// Persists the [`booking::Status`] of a [`Booking`], being the only mutable
/// part of it.
impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE bookings \
            SET status = $2::INT2 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&booking.id, &booking.status])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Locks a [`Booking`] row until the end of the current transaction, waiting
/// for it no longer than the provided [`Bounded::timeout`].
impl<C> Database<Bounded<Lock<By<Booking, booking::Id>>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Bounded {
            op: Lock(by),
            timeout,
        }: Bounded<Lock<By<Booking, booking::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        super::set_lock_timeout(self, timeout).await?;

        const SQL: &str = "\
            SELECT id \
            FROM bookings \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::booking::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::booking::list::Page, read::booking::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::list::Selector {
            arguments,
            filter: read::booking::list::Filter { client_id, plot_id },
        } = by.into_inner();

        let limit = i32::try_from(arguments.fetch_limit())
            .expect("`Arguments::MAX_FIRST` fits into `i32`");

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.after.as_ref().map(|c| {
            ps.push(c);
            ps.len()
        });
        let client_idx = client_id.as_ref().map(|c| {
            ps.push(c);
            ps.len()
        });
        let plot_idx = plot_id.as_ref().map(|p| {
            ps.push(p);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings \
             WHERE true \
                   {cursor} \
                   {client_filtering} \
                   {plot_filtering} \
             ORDER BY id ASC \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND id > ${idx}::UUID"))
            }),
            client_filtering =
                client_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND client_id = ${idx}::UUID"))
                }),
            plot_filtering = plot_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND plot_id = ${idx}::UUID"))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::booking::list::Page::new(
            &arguments,
            rows.iter().map(|row| {
                let booking = from_row(row);
                (booking.id, booking)
            }),
        ))
    }
}
