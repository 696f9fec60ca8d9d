//! [`Command`] for updating a [`booking::Status`].

use common::operations::{
    Bounded, By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, user, Booking},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for moving a [`Booking`] to another [`booking::Status`].
///
/// Performed by the payment flow on behalf of an administrator. Moving a
/// [`Booking`] to the [`booking::Status`] it has already is a no-op.
#[derive(Clone, Copy, Debug)]
pub struct UpdateBookingStatus {
    /// ID of the [`Booking`] to update.
    pub booking_id: booking::Id,

    /// [`user::Session`] of the user performing the update.
    pub initiator: user::Session,

    /// New [`booking::Status`] of the [`Booking`].
    pub status: booking::Status,
}

impl<Db> Command<UpdateBookingStatus> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Bounded<Lock<By<Booking, booking::Id>>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateBookingStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateBookingStatus {
            booking_id,
            initiator,
            status,
        } = cmd;

        if !initiator.role.is_admin() {
            return Err(tracerr::new!(E::NotAdmin(initiator.user_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent transitions of the same `Booking`.
        tx.execute(Bounded::new(
            Lock(By::<Booking, _>::new(booking_id)),
            self.config().reservation.lock_timeout,
        ))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let mut booking = tx
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;

        if booking.status == status {
            return Ok(booking);
        }
        if !booking.status.can_become(status) {
            return Err(tracerr::new!(E::InvalidTransition {
                from: booking.status,
                to: status,
            }));
        }
        booking.status = status;

        tx.execute(Update(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(booking)
    }
}

/// Error of [`UpdateBookingStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Booking`] cannot move between the provided [`booking::Status`]es.
    #[display("`Booking` cannot move from `{from}` to `{to}`")]
    #[from(ignore)]
    InvalidTransition {
        /// Current [`booking::Status`].
        from: booking::Status,

        /// Requested [`booking::Status`].
        to: booking::Status,
    },

    /// User is not an administrator.
    #[display("`User(id: {_0})` is not an administrator")]
    #[from(ignore)]
    NotAdmin(#[error(not(source))] user::Id),
}
