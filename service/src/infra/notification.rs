//! Queue of [`Notification`]s to be delivered to users.

use derive_more::{Display, Error, From};
use tokio::sync::mpsc;

use crate::domain::{booking, plot, user, Booking};

/// Event users should be notified about.
#[derive(Clone, Debug)]
pub enum Notification {
    /// New [`Booking`] was created.
    BookingCreated {
        /// ID of the created [`Booking`].
        booking_id: booking::Id,

        /// ID of the reserved [`Plot`].
        ///
        /// [`Plot`]: crate::domain::Plot
        plot_id: plot::Id,

        /// ID of the client who made the [`Booking`].
        client_id: user::Id,
    },
}

impl From<&Booking> for Notification {
    fn from(booking: &Booking) -> Self {
        Self::BookingCreated {
            booking_id: booking.id,
            plot_id: booking.plot_id,
            client_id: booking.client_id,
        }
    }
}

/// Sending side of a [`Notification`]s queue.
#[derive(Clone, Debug)]
pub struct Queue(mpsc::UnboundedSender<Notification>);

impl Queue {
    /// Enqueues the provided [`Notification`] without waiting for its
    /// delivery.
    ///
    /// # Errors
    ///
    /// If the [`Receiver`] side of the queue is gone.
    pub fn enqueue(
        &self,
        notification: Notification,
    ) -> Result<(), EnqueueError> {
        self.0.send(notification).map_err(|_| EnqueueError::Closed)
    }
}

/// Receiving side of a [`Notification`]s queue.
#[derive(Debug, From)]
pub struct Receiver(mpsc::UnboundedReceiver<Notification>);

impl Receiver {
    /// Receives the next [`Notification`].
    ///
    /// [`None`] is returned once all the [`Queue`]s are dropped.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.0.recv().await
    }
}

/// Creates a new [`Notification`]s queue.
#[must_use]
pub fn queue() -> (Queue, Receiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Queue(tx), Receiver(rx))
}

/// Error of enqueueing a [`Notification`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum EnqueueError {
    /// [`Receiver`] of the queue is dropped.
    #[display("Notifications queue is closed")]
    Closed,
}

#[cfg(test)]
mod spec {
    use super::{queue, EnqueueError, Notification};
    use crate::domain::{booking, plot, user};

    fn created() -> Notification {
        Notification::BookingCreated {
            booking_id: booking::Id::new(),
            plot_id: plot::Id::new(),
            client_id: user::Id::new(),
        }
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let (q, mut rx) = queue();
        let (first, second) = (created(), created());

        q.enqueue(first.clone()).unwrap();
        q.enqueue(second).unwrap();
        drop(q);

        let Some(Notification::BookingCreated { booking_id, .. }) =
            rx.recv().await
        else {
            panic!("no notification");
        };
        let Notification::BookingCreated { booking_id: id, .. } = first;
        assert_eq!(booking_id, id);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn fails_once_receiver_is_gone() {
        let (q, rx) = queue();
        drop(rx);

        assert!(matches!(q.enqueue(created()), Err(EnqueueError::Closed)));
    }
}
