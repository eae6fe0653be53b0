//! Service contains the booking and billing logic of the venue.
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

pub mod availability;
pub mod command;
pub mod domain;
pub mod infra;
pub mod pricing;
pub mod query;
pub mod read;

use std::time::Duration;

use common::operations::{By, Notify, Select};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use infra::{database, notifier, Database, Notifier};

use self::domain::{rate, user, Notification, User};

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Default [`rate::Table`] used for rates not overridden by the add-on
    /// catalog.
    pub rates: rate::Table,

    /// Time before an event its invoice becomes due.
    #[default(Duration::from_secs(7 * 24 * 60 * 60))]
    pub lead_time: Duration,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Ntf> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Notifier`] of this [`Service`].
    notifier: Ntf,
}

impl<Db, Ntf> Service<Db, Ntf> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db, notifier: Ntf) -> Self {
        Self {
            config,
            database,
            notifier,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Notifier`] of this [`Service`].
    #[must_use]
    pub fn notifier(&self) -> &Ntf {
        &self.notifier
    }
}

impl<Db, Ntf> Service<Db, Ntf>
where
    Ntf: Notifier<
        Notify<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    /// Delivers the provided [`Notification`]s on a best-effort basis.
    ///
    /// Delivery failures are logged and never returned.
    pub(crate) async fn notify(
        &self,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        for n in notifications {
            let template = n.template;
            if let Err(e) = self.notifier().execute(Notify(n)).await {
                log::warn!("failed to deliver `{template}` notification: {e}");
            }
        }
    }
}

impl<Db, Ntf> Service<Db, Ntf>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    Ntf: Notifier<
        Notify<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    /// Delivers [`Notification`]s built by the provided function to the
    /// [`User`] with the provided [`user::Id`] on a best-effort basis.
    ///
    /// Nothing is delivered if the [`User`] cannot be resolved.
    pub(crate) async fn notify_user<F>(&self, id: &user::Id, notifications: F)
    where
        F: FnOnce(&User) -> Vec<Notification>,
    {
        let user = Select(By::<Option<User>, _>::new(id.clone()));
        match self.database().execute(user).await {
            Ok(Some(user)) => self.notify(notifications(&user)).await,
            Ok(None) => {
                log::warn!("cannot notify `User(id: {id})`: does not exist");
            }
            Err(e) => log::warn!("cannot notify `User(id: {id})`: {e}"),
        }
    }
}
