//! [`Command`] for reserving a [`Plot`] or its part.

use std::time::Duration;

use common::{
    operations::{
        Bounded, By, Commit, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    Area, DateTime,
};
use derive_more::{Display, Error, From};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, plot, user, Booking, Plot},
    infra::{database, notification::Notification, Database},
    Service,
};

use super::Command;

/// [`Command`] for reserving a [`Plot`] as a whole or by area.
///
/// Checks the [`Plot`] capacity and mutates it atomically with creating a
/// new [`booking::Status::Pending`] [`Booking`], holding a row lock on the
/// [`Plot`] for the whole check-and-mutate sequence. Attempts failed due to
/// contention on the same [`Plot`] are retried according to the [`Config`].
#[derive(Clone, Copy, Debug)]
pub struct ReservePlot {
    /// ID of the [`Plot`] to reserve.
    pub plot_id: plot::Id,

    /// ID of the client making the reservation.
    pub client_id: user::Id,

    /// Kind of the reservation.
    pub kind: booking::Kind,

    /// [`Area`] to reserve, required for [`booking::Kind::SquareFeet`] only.
    pub requested_area: Option<Area>,
}

/// Configuration of [`ReservePlot`] [`Command`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Maximum time to wait for a [`Plot`] row lock.
    ///
    /// Also bounds waiting for a [`Booking`] row lock when its status is
    /// updated.
    #[default(Duration::from_millis(500))]
    pub lock_timeout: Duration,

    /// Maximum number of attempts made before giving up on contention.
    ///
    /// At least one attempt is made even if zero.
    #[default(3)]
    pub max_attempts: u32,

    /// Base delay between attempts, growing linearly with each of them.
    #[default(Duration::from_millis(20))]
    pub retry_backoff: Duration,
}

impl<Db> Command<ReservePlot> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Bounded<Lock<By<Plot, plot::Id>>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Plot>, plot::Id>>,
            Ok = Option<Plot>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Err = Traced<database::Error>>
        + Database<Update<Plot>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ReservePlot) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReservePlot {
            plot_id,
            client_id,
            kind,
            requested_area,
        } = cmd;
        let Config {
            lock_timeout,
            max_attempts,
            retry_backoff,
        } = self.config().reservation;

        let mut attempt = 1;
        let booking = loop {
            let res = async {
                let tx = self
                    .database()
                    .execute(Transact)
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;

                // Avoid concurrent allocations upon the same `Plot`.
                tx.execute(Bounded::new(
                    Lock(By::<Plot, _>::new(plot_id)),
                    lock_timeout,
                ))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

                let mut plot = tx
                    .execute(Select(By::<Option<Plot>, _>::new(plot_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::PlotNotExists(plot_id))
                    .map_err(tracerr::wrap!())?;

                let (allocation, total_price) = plot
                    .allocate(kind, requested_area)
                    .map_err(tracerr::from_and_wrap!(=> E))?;

                let now = DateTime::now();
                plot.updated_at = now.coerce();
                let booking = Booking {
                    id: booking::Id::new(),
                    plot_id,
                    client_id,
                    allocation,
                    total_price,
                    status: booking::Status::Pending,
                    created_at: now.coerce(),
                };

                tx.execute(Insert(booking.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                tx.execute(Update(plot))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                tx.execute(Commit)
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;

                Ok::<_, Traced<E>>(booking)
            }
            .await;

            match res {
                Ok(booking) => break booking,
                Err(e) if e.as_ref().is_contention() => {
                    if attempt >= max_attempts {
                        log::warn!(
                            "`Plot(id: {plot_id})` reservation gave up after \
                             {attempt} attempt(s): {e}",
                        );
                        return Err(tracerr::new!(E::Contention(plot_id)));
                    }
                    log::debug!(
                        "`Plot(id: {plot_id})` reservation attempt {attempt} \
                         failed, retrying: {e}",
                    );
                    tokio::time::sleep(retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if let Err(e) =
            self.notifications().enqueue(Notification::from(&booking))
        {
            log::error!(
                "failed to notify about `Booking(id: {})`: {e}",
                booking.id,
            );
        }

        Ok(booking)
    }
}

/// Error of [`ReservePlot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Plot`] cannot provide the requested allocation.
    #[display("{_0}")]
    Allocation(plot::AllocationError),

    /// [`Plot`] stayed busy with concurrent reservations for all the
    /// attempts.
    #[display("`Plot(id: {_0})` is busy with concurrent reservations")]
    #[from(ignore)]
    Contention(#[error(not(source))] plot::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Plot`] with the provided ID does not exist.
    #[display("`Plot(id: {_0})` does not exist")]
    #[from(ignore)]
    PlotNotExists(#[error(not(source))] plot::Id),
}

impl ExecutionError {
    /// Returns [`ErrorKind`] of this [`ExecutionError`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Allocation(e) if e.is_capacity() => {
                ErrorKind::CapacityExceeded
            }
            Self::Allocation(_) => ErrorKind::InvalidRequest,
            Self::Contention(_) => ErrorKind::Contention,
            Self::Db(e) if e.is_contention() => ErrorKind::Contention,
            Self::Db(_) => ErrorKind::PersistenceFailure,
            Self::PlotNotExists(_) => ErrorKind::NotFound,
        }
    }

    /// Indicates whether the failed reservation may succeed being retried.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        self.kind() == ErrorKind::Contention
    }
}

/// Kind of a [`ReservePlot`] failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// [`Plot`] doesn't exist.
    NotFound,

    /// Request is malformed.
    InvalidRequest,

    /// [`Plot`] has not enough capacity left.
    CapacityExceeded,

    /// [`Plot`] is busy with concurrent reservations, so retrying later may
    /// succeed.
    Contention,

    /// Storage failed.
    PersistenceFailure,
}

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{
        operations::{Bounded, By, Lock, Transact},
        Area, Money,
    };
    use futures::future;

    use crate::{
        command::{self, Command as _},
        domain::{booking, plot, user, Plot},
        infra::{
            notification::{self, Notification},
            Database as _, Memory,
        },
        query, Config, Query as _, Service,
    };

    use super::{ErrorKind, ReservePlot};

    fn area(s: &str) -> Area {
        Area::from_str(s).unwrap()
    }

    fn service(
        reservation: super::Config,
    ) -> (Service<Memory>, notification::Receiver) {
        let (notifications, receiver) = notification::queue();
        let svc = Service {
            config: Config::new(b"secret", reservation),
            database: Memory::new(),
            notifications,
        };
        (svc, receiver)
    }

    async fn create_plot(svc: &Service<Memory>, total: &str) -> Plot {
        svc.execute(command::CreatePlot {
            owner_id: user::Id::new(),
            title: plot::Title::new("Sunrise Meadows").unwrap(),
            location: plot::Location::new("Lonavala").unwrap(),
            total_area: area(total),
            price_per_sqft: Money::from_str("50").unwrap(),
        })
        .await
        .unwrap()
    }

    async fn plot(svc: &Service<Memory>, id: plot::Id) -> Plot {
        svc.execute(query::plot::ById::by(id)).await.unwrap().unwrap()
    }

    fn full(plot_id: plot::Id) -> ReservePlot {
        ReservePlot {
            plot_id,
            client_id: user::Id::new(),
            kind: booking::Kind::FullPlot,
            requested_area: None,
        }
    }

    fn sqft(plot_id: plot::Id, requested: &str) -> ReservePlot {
        ReservePlot {
            plot_id,
            client_id: user::Id::new(),
            kind: booking::Kind::SquareFeet,
            requested_area: Some(area(requested)),
        }
    }

    #[tokio::test]
    async fn reserves_full_plot() {
        let (svc, _rx) = service(super::Config::default());
        let p = create_plot(&svc, "1000").await;

        let booking = svc.execute(full(p.id)).await.unwrap();

        assert_eq!(booking.plot_id, p.id);
        assert_eq!(booking.allocation, booking::Allocation::FullPlot);
        assert_eq!(booking.total_price.to_string(), "50000");
        assert_eq!(booking.status, booking::Status::Pending);

        let after = plot(&svc, p.id).await;
        assert!(!after.is_available_full);
        assert_eq!(after.available_for_investment, Area::ZERO);
        assert_eq!(after.version, p.version.next());

        let stored = svc
            .execute(query::booking::ById::by(booking.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.client_id, booking.client_id);
    }

    #[tokio::test]
    async fn reserves_square_feet() {
        let (svc, _rx) = service(super::Config::default());
        let p = create_plot(&svc, "1000").await;
        _ = svc.execute(sqft(p.id, "400")).await.unwrap();

        let booking = svc.execute(sqft(p.id, "200")).await.unwrap();

        assert_eq!(booking.allocation.area(), Some(area("200")));
        assert_eq!(booking.total_price.to_string(), "10000");
        let after = plot(&svc, p.id).await;
        assert_eq!(after.available_for_investment, area("400"));
        assert!(!after.is_available_full);
    }

    #[tokio::test]
    async fn fails_on_missing_plot() {
        let (svc, _rx) = service(super::Config::default());

        let err = svc.execute(full(plot::Id::new())).await.unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn leaves_plot_untouched_on_failure() {
        let (svc, _rx) = service(super::Config::default());
        let p = create_plot(&svc, "1000").await;

        for (cmd, kind) in [
            (sqft(p.id, "1000.01"), ErrorKind::CapacityExceeded),
            (sqft(p.id, "0"), ErrorKind::InvalidRequest),
            (
                ReservePlot {
                    requested_area: None,
                    ..sqft(p.id, "1")
                },
                ErrorKind::InvalidRequest,
            ),
            (
                ReservePlot {
                    requested_area: Some(area("5")),
                    ..full(p.id)
                },
                ErrorKind::InvalidRequest,
            ),
        ] {
            let err = svc.execute(cmd).await.unwrap_err();
            assert_eq!(err.as_ref().kind(), kind, "{err}");
        }

        let after = plot(&svc, p.id).await;
        assert_eq!(after.version, p.version);
        assert_eq!(after.available_for_investment, p.available_for_investment);
        assert!(after.is_available_full);

        let page = svc
            .execute(query::bookings::List::by(
                crate::read::booking::list::Selector {
                    arguments: crate::read::booking::list::Arguments::new(
                        None, None,
                    )
                    .unwrap(),
                    filter: crate::read::booking::list::Filter {
                        plot_id: Some(p.id),
                        ..Default::default()
                    },
                },
            ))
            .await
            .unwrap();
        assert!(page.edges.is_empty());
    }

    #[tokio::test]
    async fn full_and_fractional_sales_exclude_each_other() {
        let (svc, _rx) = service(super::Config::default());

        let p = create_plot(&svc, "1000").await;
        _ = svc.execute(sqft(p.id, "1")).await.unwrap();
        let err = svc.execute(full(p.id)).await.unwrap_err();
        assert_eq!(err.as_ref().kind(), ErrorKind::CapacityExceeded);

        let p = create_plot(&svc, "1000").await;
        _ = svc.execute(full(p.id)).await.unwrap();
        let err = svc.execute(sqft(p.id, "1")).await.unwrap_err();
        assert_eq!(err.as_ref().kind(), ErrorKind::CapacityExceeded);
        let err = svc.execute(full(p.id)).await.unwrap_err();
        assert_eq!(err.as_ref().kind(), ErrorKind::CapacityExceeded);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_oversell() {
        let (svc, _rx) = service(super::Config {
            lock_timeout: Duration::from_secs(5),
            ..super::Config::default()
        });
        let p = create_plot(&svc, "1000").await;

        let results = future::join_all((0..25).map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.execute(sqft(p.id, "100")).await })
        }))
        .await;

        let mut reserved = Area::ZERO;
        let mut succeeded = 0;
        for res in results {
            match res.unwrap() {
                Ok(b) => {
                    succeeded += 1;
                    reserved = Area::new(
                        reserved.sqft() + b.allocation.area().unwrap().sqft(),
                    )
                    .unwrap();
                }
                Err(e) => {
                    assert_eq!(e.as_ref().kind(), ErrorKind::CapacityExceeded);
                }
            }
        }
        assert_eq!(succeeded, 10);
        assert_eq!(reserved, area("1000"));

        let after = plot(&svc, p.id).await;
        assert_eq!(after.available_for_investment, Area::ZERO);
        assert!(!after.is_available_full);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn only_one_of_conflicting_reservations_succeeds() {
        let (svc, _rx) = service(super::Config::default());
        let p = create_plot(&svc, "1000").await;

        let (a, b) = tokio::join!(
            tokio::spawn({
                let svc = svc.clone();
                async move { svc.execute(sqft(p.id, "700")).await }
            }),
            tokio::spawn({
                let svc = svc.clone();
                async move { svc.execute(sqft(p.id, "500")).await }
            }),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.is_ok() ^ b.is_ok(), "exactly one must succeed");
        let (won, lost) = match (a, b) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            _ => unreachable!(),
        };
        assert!(matches!(
            lost.as_ref().kind(),
            ErrorKind::CapacityExceeded | ErrorKind::Contention,
        ));

        let after = plot(&svc, p.id).await;
        assert_eq!(
            after.available_for_investment.sqft(),
            area("1000").sqft() - won.allocation.area().unwrap().sqft(),
        );
    }

    #[tokio::test]
    async fn gives_up_on_persistent_contention() {
        let (svc, _rx) = service(super::Config {
            lock_timeout: Duration::from_millis(10),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(1),
        });
        let p = create_plot(&svc, "1000").await;

        let blocker = svc.database().execute(Transact).await.unwrap();
        blocker
            .execute(Bounded::new(
                Lock(By::<Plot, _>::new(p.id)),
                Duration::from_secs(1),
            ))
            .await
            .unwrap();

        let err = svc.execute(sqft(p.id, "10")).await.unwrap_err();
        assert_eq!(err.as_ref().kind(), ErrorKind::Contention);
        assert!(err.as_ref().is_contention());

        drop(blocker);
        let after = plot(&svc, p.id).await;
        assert_eq!(after.version, p.version);
        assert_eq!(after.available_for_investment, area("1000"));

        _ = svc.execute(sqft(p.id, "10")).await.unwrap();
    }

    #[tokio::test]
    async fn notifies_about_created_booking() {
        let (svc, mut rx) = service(super::Config::default());
        let p = create_plot(&svc, "1000").await;

        let booking = svc.execute(sqft(p.id, "250")).await.unwrap();

        let notified =
            tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        let Ok(Some(Notification::BookingCreated {
            booking_id,
            plot_id,
            client_id,
        })) = notified
        else {
            panic!("no notification received");
        };
        assert_eq!(booking_id, booking.id);
        assert_eq!(plot_id, p.id);
        assert_eq!(client_id, booking.client_id);
    }

    #[tokio::test]
    async fn does_not_notify_about_failed_reservations() {
        let (svc, mut rx) = service(super::Config::default());
        let p = create_plot(&svc, "1000").await;

        _ = svc.execute(sqft(p.id, "1000.01")).await.unwrap_err();
        _ = svc.execute(full(plot::Id::new())).await.unwrap_err();
        _ = svc.execute(sqft(p.id, "0")).await.unwrap_err();
        drop(svc);

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn reserves_despite_closed_notifications_queue() {
        let (svc, rx) = service(super::Config::default());
        drop(rx);
        let p = create_plot(&svc, "1000").await;

        let booking = svc.execute(full(p.id)).await.unwrap();

        assert_eq!(booking.plot_id, p.id);
        assert!(!plot(&svc, p.id).await.is_available_full);
    }

    #[tokio::test]
    async fn refuses_unrepresentable_price() {
        let (svc, mut rx) = service(super::Config::default());
        let p = svc
            .execute(command::CreatePlot {
                owner_id: user::Id::new(),
                title: plot::Title::new("Vast Estate").unwrap(),
                location: plot::Location::new("Satara").unwrap(),
                total_area: Area::MAX,
                price_per_sqft: Money::MAX_UNIT_PRICE,
            })
            .await
            .unwrap();

        let err = svc.execute(full(p.id)).await.unwrap_err();
        assert_eq!(err.as_ref().kind(), ErrorKind::InvalidRequest);
        let err = svc.execute(sqft(p.id, "99999999")).await.unwrap_err();
        assert_eq!(err.as_ref().kind(), ErrorKind::InvalidRequest);

        let after = plot(&svc, p.id).await;
        assert_eq!(after.version, p.version);
        assert!(after.is_available_full);

        let booking = svc.execute(sqft(p.id, "10000")).await.unwrap();
        assert_eq!(booking.total_price.to_string(), "999999999900");
        drop(svc);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
