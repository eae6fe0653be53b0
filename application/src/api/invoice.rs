//! [`Invoice`]-related definitions.

use std::future;

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;

use crate::{api, api::scalar, AsError, Context, Error};

/// An invoice issued for a reservation.
#[derive(Clone, Debug)]
pub struct Invoice {
    /// Underlying [`domain::Invoice`].
    invoice: domain::Invoice,

    /// [`domain::Reservation`] of this [`Invoice`], if loaded.
    reservation: OnceCell<domain::Reservation>,
}

impl From<domain::Invoice> for Invoice {
    fn from(invoice: domain::Invoice) -> Self {
        Self {
            invoice,
            reservation: OnceCell::new(),
        }
    }
}

impl Invoice {
    /// Returns the [`domain::Reservation`] this [`Invoice`] is issued for.
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Reservation`] doesn't exist.
    async fn load_reservation(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Reservation, Error> {
        let id = self.invoice.reservation_id;
        self.reservation
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::reservation::ById::by(id))
                    .map_err(AsError::into_error)
                    .and_then(|r| {
                        future::ready(r.ok_or_else(|| {
                            api::query::ReservationError::NotExists.into()
                        }))
                    })
                    .map_err(ctx.error())
            })
            .await
    }
}

/// An invoice issued for a reservation.
#[graphql_object(context = Context)]
impl Invoice {
    /// Unique identifier of this `Invoice`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.invoice.id.into()
    }

    /// Human-readable number of this `Invoice`.
    #[must_use]
    pub fn number(&self) -> Number {
        self.invoice.number.clone().into()
    }

    /// Identifier of the `Reservation` this `Invoice` is issued for.
    #[must_use]
    pub fn reservation_id(&self) -> api::reservation::Id {
        self.invoice.reservation_id.into()
    }

    /// `Reservation` this `Invoice` is issued for.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Invoice.reservation",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn reservation(
        &self,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        Ok(self.load_reservation(ctx).await?.clone().into())
    }

    /// Identifier of the `User` this `Invoice` is addressed to.
    #[must_use]
    pub fn user_id(&self) -> api::reservation::UserId {
        self.invoice.user_id.clone().into()
    }

    /// `DateTime` when this `Invoice` was issued.
    #[must_use]
    pub fn issued_at(&self) -> DateTime {
        self.invoice.issued_at.coerce()
    }

    /// `DateTime` when this `Invoice` is due.
    #[must_use]
    pub fn due_at(&self) -> DateTime {
        self.invoice.due_at.coerce()
    }

    /// Amount left to pay.
    #[must_use]
    pub fn amount_due(&self) -> Money {
        self.invoice.amount_due
    }

    /// Amount paid so far.
    #[must_use]
    pub fn total_amount_paid(&self) -> Money {
        self.invoice.total_amount_paid
    }

    /// Current status of this `Invoice`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.invoice.status.into()
    }

    /// `Receipt`s issued against this `Invoice`, oldest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Invoice.receipts",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn receipts(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Receipt>, Error> {
        api::Query::receipts(self.invoice.id.into(), ctx).await
    }
}

/// Unique identifier of an `Invoice`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "InvoiceId", with = scalar::Via::<domain::invoice::Id>)]
pub struct Id(domain::invoice::Id);

/// Human-readable number of an `Invoice`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "InvoiceNumber",
    with = scalar::Via::<domain::invoice::Number>,
)]
pub struct Number(domain::invoice::Number);

/// Status of an `Invoice`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "InvoiceStatus",
    with = scalar::Via::<domain::invoice::Status>,
)]
pub struct Status(domain::invoice::Status);
