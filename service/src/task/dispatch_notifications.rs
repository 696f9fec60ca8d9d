//! [`DispatchNotifications`] [`Task`].

use std::convert::Infallible;

use common::operations::{By, Perform, Start};
use tracing as log;

use crate::{
    infra::notification::{Notification, Receiver},
    Service,
};

use super::Task;

/// [`Task`] delivering queued [`Notification`]s to users.
///
/// Delivery channels (email, SMS, push) live outside of this service, so
/// [`Notification`]s are only logged for now.
#[derive(Clone, Copy, Debug)]
pub struct DispatchNotifications;

impl<Db> Task<Start<By<DispatchNotifications, Receiver>>> for Service<Db> {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<DispatchNotifications, Receiver>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut receiver = by.into_inner();
        while let Some(notification) = receiver.recv().await {
            _ = self.execute(Perform(notification)).await;
        }
        log::debug!("`task::DispatchNotifications` stopped: queue is closed");
        Ok(())
    }
}

impl<Db> Task<Perform<Notification>> for Service<Db> {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Perform(notification): Perform<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        match notification {
            Notification::BookingCreated {
                booking_id,
                plot_id,
                client_id,
            } => {
                log::info!(
                    %booking_id,
                    %plot_id,
                    %client_id,
                    "`Booking` created",
                );
            }
        }
        Ok(())
    }
}
