//! [`Database`] implementations.

use std::{ops::Bound, sync::PoisonError};

use common::operations::{
    Bounded, By, Commit, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{booking, plot, Booking, Plot},
    infra::{database, Database},
    read,
};

use super::{Memory, NonTx, RowKey, Storage, Tx, Write};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx::from_non_tx(self.0.clone())))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit()
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<C: Storage> Database<Select<By<Option<Plot>, plot::Id>>> for Memory<C> {
    type Ok = Option<Plot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Plot>, plot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.plot(by.into_inner()))
    }
}

impl<C: Storage> Database<Insert<Plot>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(plot): Insert<Plot>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(Write::InsertPlot(plot))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<C: Storage> Database<Update<Plot>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(plot): Update<Plot>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(Write::UpdatePlot(plot))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Bounded<Lock<By<Plot, plot::Id>>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Bounded {
            op: Lock(by),
            timeout,
        }: Bounded<Lock<By<Plot, plot::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(RowKey::Plot(by.into_inner()), Some(timeout))
            .await
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<C: Storage> Database<Select<By<Option<Booking>, booking::Id>>>
    for Memory<C>
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.booking(by.into_inner()))
    }
}

impl<C: Storage> Database<Insert<Booking>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(Write::InsertBooking(booking))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<C: Storage> Database<Update<Booking>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(Write::UpdateBooking(booking))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Bounded<Lock<By<Booking, booking::Id>>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Bounded {
            op: Lock(by),
            timeout,
        }: Bounded<Lock<By<Booking, booking::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(RowKey::Booking(by.into_inner()), Some(timeout))
            .await
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Select<By<read::plot::list::Page, read::plot::list::Selector>>>
    for Memory<NonTx>
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

        let plots = self
            .tables()
            .plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let rows = plots
            .range((
                arguments.after.map_or(Bound::Unbounded, Bound::Excluded),
                Bound::Unbounded,
            ))
            .filter(|(_, p)| owner_id.map_or(true, |id| p.owner_id == id))
            .filter(|(_, p)| {
                !available_only || p.available_for_investment.is_positive()
            })
            .take(arguments.fetch_limit())
            .map(|(id, p)| (*id, p.clone()));

        Ok(read::plot::list::Page::new(&arguments, rows))
    }
}

impl
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Memory<NonTx>
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

        let bookings = self
            .tables()
            .bookings
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let rows = bookings
            .range((
                arguments.after.map_or(Bound::Unbounded, Bound::Excluded),
                Bound::Unbounded,
            ))
            .filter(|(_, b)| client_id.map_or(true, |id| b.client_id == id))
            .filter(|(_, b)| plot_id.map_or(true, |id| b.plot_id == id))
            .take(arguments.fetch_limit())
            .map(|(id, b)| (*id, b.clone()));

        Ok(read::booking::list::Page::new(&arguments, rows))
    }
}
