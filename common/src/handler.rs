//! [`Handler`] definitions.

use std::future::Future;

/// Something able to execute the `Op`eration.
///
/// One type usually implements [`Handler`] for many operations, so the
/// operation type alone selects what gets executed.
pub trait Handler<Op = ()> {
    /// Result of a successful execution.
    type Ok;

    /// Error of a failed execution.
    type Err;

    /// Executes the provided `Op`eration.
    fn execute(
        &self,
        op: Op,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
