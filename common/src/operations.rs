//! Operations a [`Handler`] may execute.
//!
//! An operation only names an intent, while its meaning is given by the
//! [`Handler`] implementation accepting it.

use std::{marker::PhantomData, time::Duration};

use crate::Handler;

/// Declares single-field operations wrapping their subject.
macro_rules! wrapping_operations {
    ($($(#[doc = $doc:literal])* $name:ident),* $(,)?) => {$(
        $(#[doc = $doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name<T>(pub T);
    )*};
}

wrapping_operations! {
    /// Stores a new value.
    Insert,
    /// Overwrites an already stored value.
    Update,
    /// Reads a value.
    Select,
    /// Takes an exclusive lock on a value until the current transaction
    /// ends.
    Lock,
    /// Launches a long-running process.
    Start,
    /// Carries out a single unit of work.
    Perform,
}

/// Opens a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Handle a [`Handler`] returns on [`Transact`].
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Commits a [`Transact`]ed handle.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Operation given up on once its `timeout` elapses.
#[derive(Clone, Copy, Debug)]
pub struct Bounded<T> {
    /// Bounded operation.
    pub op: T,

    /// How long the operation may take.
    pub timeout: Duration,
}

impl<T> Bounded<T> {
    /// Gives up the provided `op`eration after the `timeout`.
    #[must_use]
    pub fn new(op: T, timeout: Duration) -> Self {
        Self { op, timeout }
    }
}

/// Key `B` addressing a `W` value.
///
/// `W` only disambiguates operations sharing the same key type.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Addressed value type.
    _what: PhantomData<W>,

    /// Key.
    by: B,
}

impl<W, B> By<W, B> {
    /// Addresses a `W` value by the provided key.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Unwraps the key.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
