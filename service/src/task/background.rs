//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use derive_more::{Display, Error as StdError};
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _,
};
use tokio::task;

#[cfg(doc)]
use crate::Task;

/// Background environment for running [`Task`]s.
///
/// Spawned [`Task`]s make no progress until this [`Background`] is awaited.
/// Awaiting resolves once all of them complete, or with the first
/// [`Failure`].
#[derive(Debug, Default)]
pub struct Background {
    /// [`task::LocalSet`] driving the spawned [`Task`]s.
    local: task::LocalSet,

    /// [`Task`]s spawned into this [`Background`].
    spawned: Vec<Spawned>,
}

/// [`Task`] spawned into a [`Background`].
#[derive(Debug)]
struct Spawned {
    /// Name of the [`Task`].
    name: &'static str,

    /// Handle to await the [`Task`] result with.
    handle: task::JoinHandle<Result<(), Box<dyn Error>>>,
}

impl Background {
    /// Spawns a new [`Task`] with the provided `name` inside this
    /// [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        let handle = self
            .local
            .spawn_local(future.map(|r| r.map_err(Box::<dyn Error>::from)));
        self.spawned.push(Spawned { name, handle });
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { local, spawned } = self;

        let all = future::try_join_all(spawned.into_iter().map(
            |Spawned { name, handle }| {
                handle.map(move |res| match res {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(source)) => Err(Failure { task: name, source }),
                    Err(e) => Err(Failure {
                        task: name,
                        source: e.into(),
                    }),
                })
            },
        ));

        async move { local.run_until(all).await.map(drop) }.boxed_local()
    }
}

/// Failure of a [`Task`] running in a [`Background`].
#[derive(Debug, Display, StdError)]
#[display("`{task}` task failed: {source}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    pub task: &'static str,

    /// Error the [`Task`] failed with.
    #[error(not(source))]
    pub source: Box<dyn Error>,
}

#[cfg(test)]
mod spec {
    use std::{convert::Infallible, fmt, future::IntoFuture as _};

    use super::Background;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[tokio::test]
    async fn resolves_when_all_complete() {
        let mut bg = Background::default();
        bg.spawn("first", async { Ok::<_, Infallible>(()) });
        bg.spawn("second", async {
            tokio::task::yield_now().await;
            Ok::<_, Infallible>(())
        });

        bg.into_future().await.unwrap();
    }

    #[tokio::test]
    async fn reports_failed_task() {
        let mut bg = Background::default();
        bg.spawn("ok", async { Ok::<_, Boom>(()) });
        bg.spawn("failing", async { Err::<(), _>(Boom) });

        let err = bg.into_future().await.unwrap_err();

        assert_eq!(err.task, "failing");
        assert_eq!(err.to_string(), "`failing` task failed: boom");
    }
}
