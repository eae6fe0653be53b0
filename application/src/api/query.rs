//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{pricing, query, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Reservation` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_EXISTS` - the `Reservation` with the specified ID
    ///                              does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        ctx.service()
            .execute(query::reservation::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ReservationError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Invoice` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVOICE_NOT_EXISTS` - the `Invoice` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "invoice",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn invoice(
        id: api::invoice::Id,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        ctx.service()
            .execute(query::invoice::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| InvoiceError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Invoice` issued for the `Reservation` with the specified
    /// ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVOICE_NOT_EXISTS` - the `Reservation` has no `Invoice`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "invoiceByReservation",
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn invoice_by_reservation(
        reservation_id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        ctx.service()
            .execute(query::invoice::ByReservationId::by(reservation_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| InvoiceError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Receipt`s issued against the `Invoice` with the
    /// specified ID, oldest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "receipts",
            invoice_id = %invoice_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn receipts(
        invoice_id: api::invoice::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Receipt>, Error> {
        ctx.service()
            .execute(query::receipt::ByInvoiceId::by(invoice_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|receipts| receipts.into_iter().map(Into::into).collect())
    }

    /// Previews the `Price` of a reservation without storing anything.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADD_ON_NOT_EXISTS` - requested `AddOn` does not exist;
    /// - `INVALID_SEAT_COUNT` - seat count exceeds the venue capacity;
    /// - `INVALID_COUNT` - add-on quantity is out of range;
    /// - `AMBIGUOUS_DISCOUNT_VALUE` - discount must be either a percentage
    ///                                or an amount.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "quote",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn quote(
        input: api::reservation::QuoteInput,
        ctx: &Context,
    ) -> Result<api::Price, Error> {
        let input: pricing::Input = input.try_into().map_err(ctx.error())?;
        ctx.service()
            .execute(query::Quote(input))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum ReservationError {
        #[code = "RESERVATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` with the provided ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum InvoiceError {
        #[code = "INVOICE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Invoice` does not exist"]
        NotExists,
    }
}

impl AsError for query::quote::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ADD_ON_NOT_EXISTS"]
                #[status = BAD_REQUEST]
                #[message = "Requested `AddOn` does not exist"]
                AddOnNotExists,
            }
        }

        match self {
            Self::AddOnNotExists(_) => Some(Error::AddOnNotExists.into()),
            Self::Db(e) => e.try_as_error(),
        }
    }
}
