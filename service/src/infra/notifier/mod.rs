//! [`Notifier`]-related implementations.

mod log;
#[cfg(test)]
pub mod recorder;

use derive_more::{Display, Error as StdError};

pub use self::log::Log;
#[cfg(test)]
pub use self::recorder::Recorder;

/// Notification gateway operation.
pub use common::Handler as Notifier;

/// [`Notifier`] error.
#[derive(Debug, Display, StdError)]
pub enum Error {
    /// Gateway rejected or failed to deliver a notification.
    #[display("notification gateway failed: {_0}")]
    Gateway(#[error(not(source))] String),
}
