//! [`Plot`]-related [`Database`] implementations.

use common::operations::{Bounded, By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{plot, Plot},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
    read,
};

/// Columns of the `plots` table in the order [`from_row()`] expects them.
const COLUMNS: &str = "\
    id, owner_id, title, location, \
    total_area, price_per_sqft, \
    is_available_full, available_for_investment, \
    is_verified, version, \
    created_at, updated_at";

/// Restores a [`Plot`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Plot {
    Plot {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        location: row.get("location"),
        total_area: row.get("total_area"),
        price_per_sqft: row.get("price_per_sqft"),
        is_available_full: row.get("is_available_full"),
        available_for_investment: row.get("available_for_investment"),
        is_verified: row.get("is_verified"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Plot>, plot::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Plot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Plot>, plot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: plot::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM plots \
             WHERE id = $1::UUID"
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Insert<Plot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(plot): Insert<Plot>,
    ) -> Result<Self::Ok, Self::Err> {
        let Plot {
            id,
            owner_id,
            title,
            location,
            total_area,
            price_per_sqft,
            is_available_full,
            available_for_investment,
            is_verified,
            version,
            created_at,
            updated_at,
        } = plot;

        let sql = format!(
            "INSERT INTO plots ({COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::UUID, $3::VARCHAR, $4::VARCHAR, \
                 $5::NUMERIC, $6::NUMERIC, \
                 $7::BOOL, $8::NUMERIC, \
                 $9::BOOL, $10::INT8, \
                 $11::TIMESTAMPTZ, $12::TIMESTAMPTZ\
             )"
        );
        self.exec(
            &sql,
            &[
                &id,
                &owner_id,
                &title,
                &location,
                &total_area,
                &price_per_sqft,
                &is_available_full,
                &available_for_investment,
                &is_verified,
                &version,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

/// Persists the mutable state of a [`Plot`].
///
/// [`Plot::version`] is expected to be the one the [`Plot`] was read with.
/// The stored version is incremented, and the update fails with a
/// [`postgres::Error::StaleVersion`] if the row was modified in between.
impl<C> Database<Update<Plot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(plot): Update<Plot>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE plots \
            SET title = $3::VARCHAR, \
                location = $4::VARCHAR, \
                is_available_full = $5::BOOL, \
                available_for_investment = $6::NUMERIC, \
                is_verified = $7::BOOL, \
                updated_at = $8::TIMESTAMPTZ, \
                version = version + 1 \
            WHERE id = $1::UUID \
              AND version = $2::INT8";
        let updated = self
            .exec(
                SQL,
                &[
                    &plot.id,
                    &plot.version,
                    &plot.title,
                    &plot.location,
                    &plot.is_available_full,
                    &plot.available_for_investment,
                    &plot.is_verified,
                    &plot.updated_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;

        if updated == 0 {
            return Err(tracerr::new!(database::Error::from(
                postgres::Error::StaleVersion("plots"),
            )));
        }
        Ok(())
    }
}

/// Locks a [`Plot`] row until the end of the current transaction.
///
/// Fails with a lock timeout error if the row stays locked by another
/// transaction longer than the provided [`Bounded::timeout`].
impl<C> Database<Bounded<Lock<By<Plot, plot::Id>>>> for Postgres<C>
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
        }: Bounded<Lock<By<Plot, plot::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: plot::Id = by.into_inner();

        super::set_lock_timeout(self, timeout).await?;

        const LOCK_SQL: &str = "\
            SELECT id \
            FROM plots \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(LOCK_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::plot::list::Page, read::plot::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::plot::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::plot::list::Page, read::plot::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::plot::list::Selector {
            arguments,
            filter:
                read::plot::list::Filter {
                    available_only,
                    owner_id,
                },
        } = by.into_inner();

        let limit = i32::try_from(arguments.fetch_limit())
            .expect("`Arguments::MAX_FIRST` fits into `i32`");

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.after.as_ref().map(|c| {
            ps.push(c);
            ps.len()
        });
        let owner_idx = owner_id.as_ref().map(|o| {
            ps.push(o);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM plots \
             WHERE true \
                   {cursor} \
                   {owner_filtering} \
                   {availability_filtering} \
             ORDER BY id ASC \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND id > ${idx}::UUID"))
            }),
            owner_filtering =
                owner_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND owner_id = ${idx}::UUID"))
                }),
            availability_filtering = if available_only {
                "AND available_for_investment > 0"
            } else {
                ""
            },
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::plot::list::Page::new(
            &arguments,
            rows.iter().map(|row| {
                let plot = from_row(row);
                (plot.id, plot)
            }),
        ))
    }
}
