//! GraphQL API definitions.

pub mod invoice;
mod mutation;
pub mod price;
mod query;
pub mod receipt;
pub mod reservation;
pub mod scalar;

use juniper::EmptySubscription;

use crate::Context;

pub use self::{
    invoice::Invoice, mutation::Mutation, price::Price, query::Query,
    receipt::Receipt, reservation::Reservation,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;
