//! [`Memory`] database clients.

use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::OwnedMutexGuard;

use crate::domain::{booking, plot, Booking, Plot};
#[cfg(doc)]
use crate::infra::Memory;

use super::{Error, RowKey, Storage, Tables, Write};

/// Non-transactional [`Memory`] database client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// Committed state of the database.
    tables: Arc<Tables>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided [`Tables`].
    pub(super) fn new(tables: Arc<Tables>) -> Self {
        Self { tables }
    }

    /// Returns the committed state of the database.
    pub(super) fn tables(&self) -> &Tables {
        &self.tables
    }
}

impl Storage for NonTx {
    fn plot(&self, id: plot::Id) -> Option<Plot> {
        self.tables.plot(id)
    }

    fn booking(&self, id: booking::Id) -> Option<Booking> {
        self.tables.booking(id)
    }

    fn write(&self, write: Write) -> Result<(), Error> {
        self.tables.apply(vec![write])
    }
}

/// Transactional [`Memory`] database client.
///
/// Rolled back once the last clone of it is dropped without being
/// [`Tx::commit()`]ted, releasing all the row locks it holds.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client this [`Tx`] was started from.
    non_tx: NonTx,

    /// Uncommitted state of this [`Tx`].
    state: Arc<Mutex<State>>,
}

/// Uncommitted state of a [`Tx`].
#[derive(Debug, Default)]
struct State {
    /// Staged [`Write`]s in the order they were performed.
    writes: Vec<Write>,

    /// Row locks held by the [`Tx`].
    locks: HashMap<RowKey, RowLock>,
}

/// Held row lock, released once dropped.
#[derive(Debug)]
struct RowLock {
    /// Key of the locked row.
    key: RowKey,

    /// Guard of the row lock.
    guard: Option<OwnedMutexGuard<()>>,

    /// [`Tables`] the lock belongs to.
    tables: Arc<Tables>,
}

impl Drop for RowLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.tables.release(self.key);
    }
}

impl Tx {
    /// Starts a new [`Tx`] from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(non_tx: NonTx) -> Self {
        Self {
            non_tx,
            state: Arc::default(),
        }
    }

    /// Runs the provided function over the [`State`] of this [`Tx`].
    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Locks the row identified by the provided [`RowKey`] until this [`Tx`]
    /// ends, waiting no longer than the provided `timeout`, if any.
    ///
    /// Locking the same row twice in a [`Tx`] is a no-op.
    pub(super) async fn lock(
        &self,
        key: RowKey,
        timeout: Option<Duration>,
    ) -> Result<(), Error> {
        if self.with_state(|s| s.locks.contains_key(&key)) {
            return Ok(());
        }

        let tables = &self.non_tx.tables;
        let lock = tables.lock_of(key);
        let guard = match timeout {
            Some(timeout) => {
                tokio::time::timeout(timeout, lock.lock_owned()).await.ok()
            }
            None => Some(lock.lock_owned().await),
        };
        let Some(guard) = guard else {
            tables.release(key);
            return Err(Error::LockTimeout(key.table()));
        };

        let lock = RowLock {
            key,
            guard: Some(guard),
            tables: Arc::clone(tables),
        };
        _ = self.with_state(|s| s.locks.insert(key, lock));
        Ok(())
    }

    /// Commits this [`Tx`], releasing all the row locks it holds.
    ///
    /// # Errors
    ///
    /// If any of the staged [`Write`]s conflicts with the committed state.
    /// Nothing is applied in such case.
    pub fn commit(&self) -> Result<(), Error> {
        let State { writes, locks } = self.with_state(mem::take);
        let res = self.non_tx.tables().apply(writes);
        drop(locks);
        res
    }
}

impl State {
    /// Returns the latest staged version of the [`Plot`] with the provided
    /// [`plot::Id`], if any.
    fn plot_mut(&mut self, id: plot::Id) -> Option<&mut Plot> {
        self.writes.iter_mut().rev().find_map(|w| match w {
            Write::InsertPlot(p) | Write::UpdatePlot(p) => {
                (p.id == id).then_some(p)
            }
            Write::InsertBooking(_) | Write::UpdateBooking(_) => None,
        })
    }

    /// Returns the latest staged version of the [`Booking`] with the provided
    /// [`booking::Id`], if any.
    fn booking_mut(&mut self, id: booking::Id) -> Option<&mut Booking> {
        self.writes.iter_mut().rev().find_map(|w| match w {
            Write::InsertBooking(b) | Write::UpdateBooking(b) => {
                (b.id == id).then_some(b)
            }
            Write::InsertPlot(_) | Write::UpdatePlot(_) => None,
        })
    }
}

impl Storage for Tx {
    fn plot(&self, id: plot::Id) -> Option<Plot> {
        self.with_state(|s| s.plot_mut(id).cloned())
            .or_else(|| self.non_tx.plot(id))
    }

    fn booking(&self, id: booking::Id) -> Option<Booking> {
        self.with_state(|s| s.booking_mut(id).cloned())
            .or_else(|| self.non_tx.booking(id))
    }

    /// Stages the provided [`Write`] until this [`Tx`] is committed.
    ///
    /// An update of an already staged row is merged into the staged write,
    /// so the row version is checked against the one it was first read with.
    fn write(&self, write: Write) -> Result<(), Error> {
        self.with_state(|s| match write {
            Write::UpdatePlot(new) => {
                if let Some(p) = s.plot_mut(new.id) {
                    *p = Plot {
                        version: p.version,
                        ..new
                    };
                } else {
                    s.writes.push(Write::UpdatePlot(new));
                }
            }
            Write::UpdateBooking(new) => {
                if let Some(b) = s.booking_mut(new.id) {
                    *b = new;
                } else {
                    s.writes.push(Write::UpdateBooking(new));
                }
            }
            w @ (Write::InsertPlot(_) | Write::InsertBooking(_)) => {
                s.writes.push(w);
            }
        });
        Ok(())
    }
}
