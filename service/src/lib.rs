//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::error::Error;

use common::operations::{By, Start};
use derive_more::Debug;

#[cfg(doc)]
use infra::Database;
use infra::notification;

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`command::ReservePlot`] configuration.
    pub reservation: command::reserve_plot::Config,
}

impl Config {
    /// Creates a new [`Config`] verifying [JWT]s with the provided HMAC
    /// `secret`.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[must_use]
    pub fn new(
        secret: &[u8],
        reservation: command::reserve_plot::Config,
    ) -> Self {
        Self {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            reservation,
        }
    }
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Queue of [`notification::Notification`]s to be dispatched.
    notifications: notification::Queue,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// Returned [`task::Background`] dispatches the queued
    /// [`notification::Notification`]s, so must be polled along.
    pub fn new(config: Config, database: Db) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<task::DispatchNotifications, notification::Receiver>,
                >,
                Ok = (),
                Err: Error + 'static,
            > + Clone
            + 'static,
    {
        let (notifications, receiver) = notification::queue();
        let this = Service {
            config,
            database,
            notifications,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("DispatchNotifications", async move {
            svc.execute(Start(By::new(receiver))).await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`notification::Queue`] of this [`Service`].
    #[must_use]
    pub fn notifications(&self) -> &notification::Queue {
        &self.notifications
    }
}
