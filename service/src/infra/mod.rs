//! Infrastructure layer.

pub mod database;
pub mod notifier;

pub use self::{database::Database, notifier::Notifier};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
