//! GraphQL [`Mutation`]s definitions.

use common::DateTime;
use juniper::graphql_object;
use service::{command, domain::reservation::Action, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new `Reservation` with the provided booking details and
    /// issues its `Invoice`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MISSING_USER_ID` - `userId` is not provided;
    /// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist;
    /// - `START_IN_PAST` - the event starts in the past;
    /// - `END_BEFORE_START`/`EFFECTIVE_END_BEFORE_START` - the event ends
    ///                                                    before it starts;
    /// - `ADD_ON_NOT_EXISTS` - requested `AddOn` does not exist;
    /// - `SLOT_OCCUPIED` - the time slot is occupied by another
    ///                     `Reservation`;
    /// - `RESERVATION_EXISTS` - `Reservation` with the provided ID exists;
    /// - `INVOICE_NUMBER_OCCUPIED` - `Invoice` number is occupied.
    #[tracing::instrument(
        skip_all,
        fields(
            ends_at = %booking.ends_at.format(),
            gql.name = "createReservation",
            id = ?id.map(|id| id.to_string()),
            otel.name = Self::SPAN_NAME,
            starts_at = %booking.starts_at.format(),
            user_id = ?user_id.as_ref().map(ToString::to_string),
        ),
    )]
    pub async fn create_reservation(
        booking: api::reservation::BookingInput,
        user_id: Option<api::reservation::UserId>,
        id: Option<api::reservation::Id>,
        status: Option<api::reservation::Status>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let booking: command::create_reservation::Booking =
            booking.try_into().map_err(ctx.error())?;
        ctx.service()
            .execute(command::CreateReservation {
                id: id.map(Into::into),
                user_id: user_id.map(Into::into),
                status: status.map(Into::into),
                booking,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the booking details of the `Reservation` with the provided
    /// ID, recomputing its price and `Invoice`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_EXISTS` - `Reservation` with the provided ID does
    ///                              not exist;
    /// - `USER_MISMATCH` - provided `userId` doesn't own the `Reservation`;
    /// - `START_IN_PAST` - the event is moved to the past;
    /// - `END_BEFORE_START`/`EFFECTIVE_END_BEFORE_START` - the event ends
    ///                                                    before it starts;
    /// - `ADD_ON_NOT_EXISTS` - requested `AddOn` does not exist;
    /// - `PRICE_BELOW_PAID` - the new price is below the amount already paid
    ///                        for the `Invoice`;
    /// - `SLOT_OCCUPIED` - the time slot is occupied by another
    ///                     `Reservation`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_reservation(
        id: api::reservation::Id,
        booking: api::reservation::BookingInput,
        user_id: Option<api::reservation::UserId>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let booking: command::create_reservation::Booking =
            booking.try_into().map_err(ctx.error())?;
        ctx.service()
            .execute(command::UpdateReservation {
                id: id.into(),
                user_id: user_id.map(Into::into),
                booking,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the `Reservation` with the provided ID, withdrawing its
    /// `Invoice`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_EXISTS` - `Reservation` with the provided ID does
    ///                              not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        ctx.service()
            .execute(command::CancelReservation { id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Restores the `Reservation` with the provided ID to the provided
    /// status, reissuing its `Invoice`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_RESTORABLE` - the `status` is `Cancelled`;
    /// - `RESERVATION_NOT_EXISTS` - `Reservation` with the provided ID does
    ///                              not exist;
    /// - `SLOT_OCCUPIED` - the time slot has been taken meanwhile.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "restoreReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
            status = %status,
        ),
    )]
    pub async fn restore_reservation(
        id: api::reservation::Id,
        status: api::reservation::Status,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        ctx.service()
            .execute(command::RestoreReservation {
                id: id.into(),
                status: status.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels every existing `Reservation` out of the provided IDs
    /// independently.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATIONS_FAILED` - reported only when the `complete` field is
    ///                           selected, naming the `failed` IDs (either
    ///                           not existing or rejected on their own, like
    ///                           an occupied slot); otherwise the `failed`
    ///                           field is the only failure indicator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelReservations",
            ids = ?ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_reservations(
        ids: Vec<api::reservation::Id>,
        ctx: &Context,
    ) -> Result<api::reservation::batch::Outcome, Error> {
        ctx.service()
            .execute(command::CancelReservations {
                ids: ids.into_iter().map(Into::into).collect(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Restores every existing `Reservation` out of the provided IDs to the
    /// `Pending` status independently.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATIONS_FAILED` - reported only when the `complete` field is
    ///                           selected, naming the `failed` IDs (either
    ///                           not existing or rejected on their own, like
    ///                           an occupied slot); otherwise the `failed`
    ///                           field is the only failure indicator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "restoreReservations",
            ids = ?ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn restore_reservations(
        ids: Vec<api::reservation::Id>,
        ctx: &Context,
    ) -> Result<api::reservation::batch::Outcome, Error> {
        ctx.service()
            .execute(command::RestoreReservations {
                ids: ids.into_iter().map(Into::into).collect(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Applies the status action with the provided name (e.g. `Approve`,
    /// `Mark as Done`, `Restore to Booked`) to the `Reservation` with the
    /// provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `UNKNOWN_ACTION` - the `action` is not recognized;
    /// - `RESERVATION_NOT_EXISTS` - `Reservation` with the provided ID does
    ///                              not exist;
    /// - `SLOT_OCCUPIED` - the time slot has been taken meanwhile.
    #[tracing::instrument(
        skip_all,
        fields(
            action = %action,
            gql.name = "updateReservationStatus",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_reservation_status(
        id: api::reservation::Id,
        action: String,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let action = Action::parse(&action)
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        ctx.service()
            .execute(command::UpdateReservationStatus {
                id: id.into(),
                action,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Records a payment session against the `Invoice` with the provided ID
    /// and issues a `Receipt` for it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVOICE_NOT_EXISTS` - `Invoice` with the provided ID does not
    ///                          exist;
    /// - `NO_PAYMENTS` - no `payments` are provided;
    /// - `NON_POSITIVE_PAYMENT` - some payment amount is not positive;
    /// - `NEGATIVE_AMOUNT_DUE` - the `Invoice` amount due is negative;
    /// - `OVERPAYMENT` - the session pays more than is due.
    #[tracing::instrument(
        skip_all,
        fields(
            cashier_name = %cashier_name,
            gql.name = "createReceipt",
            invoice_id = %invoice_id,
            otel.name = Self::SPAN_NAME,
            paid_by = %paid_by,
        ),
    )]
    pub async fn create_receipt(
        invoice_id: api::invoice::Id,
        payments: Vec<api::receipt::PaymentInput>,
        paid_by: api::receipt::Name,
        cashier_name: api::receipt::Name,
        paid_at: Option<DateTime>,
        ctx: &Context,
    ) -> Result<api::Receipt, Error> {
        ctx.service()
            .execute(command::CreateReceipt {
                invoice_id: invoice_id.into(),
                payments: payments.into_iter().map(Into::into).collect(),
                paid_by: paid_by.into(),
                paid_at: paid_at.map(DateTime::coerce),
                cashier_name: cashier_name.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum BookingError {
        #[code = "ADD_ON_NOT_EXISTS"]
        #[status = BAD_REQUEST]
        #[message = "Requested `AddOn` does not exist"]
        AddOnNotExists,

        #[code = "MISSING_USER_ID"]
        #[status = BAD_REQUEST]
        #[message = "`userId` must be provided"]
        MissingUserId,

        #[code = "NOT_RESTORABLE"]
        #[status = BAD_REQUEST]
        #[message = "`Reservation` cannot be restored to the `Cancelled` \
                     status"]
        NotRestorable,

        #[code = "RESERVATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` with the provided ID does not exist"]
        ReservationNotExists,

        #[code = "SLOT_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "Requested time slot is occupied by another \
                     `Reservation`"]
        SlotOccupied,
    }
}

impl AsError for command::create_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVOICE_NUMBER_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`Invoice` number is occupied by another \
                             `Invoice`"]
                InvoiceNumberOccupied,

                #[code = "RESERVATION_EXISTS"]
                #[status = CONFLICT]
                #[message = "`Reservation` with the provided ID already \
                             exists"]
                ReservationExists,

                #[code = "USER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`User` with the provided ID does not exist"]
                UserNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Schedule(v) => return v.try_as_error(),
            Self::AddOnNotExists(_) => BookingError::AddOnNotExists.into(),
            Self::InvoiceNumberOccupied(_) => {
                Error::InvoiceNumberOccupied.into()
            }
            Self::MissingUserId => BookingError::MissingUserId.into(),
            Self::ReservationExists(_) => Error::ReservationExists.into(),
            Self::SlotOccupied => BookingError::SlotOccupied.into(),
            Self::UserNotExists(_) => Error::UserNotExists.into(),
        })
    }
}

impl AsError for command::update_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PRICE_BELOW_PAID"]
                #[status = BAD_REQUEST]
                #[message = "New price is below the amount already paid"]
                PriceBelowPaid,

                #[code = "USER_MISMATCH"]
                #[status = BAD_REQUEST]
                #[message = "`Reservation` is owned by another `User`"]
                UserMismatch,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Schedule(v) => return v.try_as_error(),
            Self::AddOnNotExists(_) => BookingError::AddOnNotExists.into(),
            Self::MissingUserId => BookingError::MissingUserId.into(),
            Self::ReservationNotExists(_) => {
                BookingError::ReservationNotExists.into()
            }
            Self::PriceBelowPaid(_) => Error::PriceBelowPaid.into(),
            Self::SlotOccupied => BookingError::SlotOccupied.into(),
            Self::UserMismatch(_) => Error::UserMismatch.into(),
        })
    }
}

impl AsError for command::cancel_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ReservationNotExists(_) => {
                Some(BookingError::ReservationNotExists.into())
            }
        }
    }
}

impl AsError for command::restore_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotRestorable(_) => Some(BookingError::NotRestorable.into()),
            Self::ReservationNotExists(_) => {
                Some(BookingError::ReservationNotExists.into())
            }
            Self::SlotOccupied => Some(BookingError::SlotOccupied.into()),
        }
    }
}

impl AsError for command::update_reservation_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotRestorable(_) => Some(BookingError::NotRestorable.into()),
            Self::ReservationNotExists(_) => {
                Some(BookingError::ReservationNotExists.into())
            }
            Self::SlotOccupied => Some(BookingError::SlotOccupied.into()),
        }
    }
}

impl AsError for command::create_receipt::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVOICE_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Invoice` with the provided ID does not exist"]
                InvoiceNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvoiceNotExists(_) => Some(Error::InvoiceNotExists.into()),
            Self::Rejected(r) => r.try_as_error(),
            Self::ReservationNotExists(_) => {
                Some(BookingError::ReservationNotExists.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use common::Money;
    use service::{
        availability::Violation,
        command::{
            create_reservation, restore_reservation, update_reservation,
            update_reservation_status,
        },
        domain::{invoice, reservation},
    };

    use crate::AsError as _;

    #[test]
    fn maps_booking_conflicts() {
        use create_reservation::ExecutionError as E;

        for (err, code, status) in [
            (E::SlotOccupied, "SLOT_OCCUPIED", http::StatusCode::CONFLICT),
            (
                E::ReservationExists(1.into()),
                "RESERVATION_EXISTS",
                http::StatusCode::CONFLICT,
            ),
            (
                E::MissingUserId,
                "MISSING_USER_ID",
                http::StatusCode::BAD_REQUEST,
            ),
            (
                E::Schedule(Violation::StartInPast),
                "START_IN_PAST",
                http::StatusCode::BAD_REQUEST,
            ),
        ] {
            let err = err.as_error();
            assert_eq!(err.code, code);
            assert_eq!(err.status_code, status);
        }
    }

    #[test]
    fn maps_missing_reservation_to_not_found() {
        let err = update_reservation_status::ExecutionError::ReservationNotExists(
            3.into(),
        )
        .as_error();

        assert_eq!(err.code, "RESERVATION_NOT_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn maps_price_below_paid_to_bad_request() {
        let err = update_reservation::ExecutionError::PriceBelowPaid(
            invoice::BelowPaid {
                total: Money::from(1809),
                paid: Money::from(1998),
            },
        )
        .as_error();

        assert_eq!(err.code, "PRICE_BELOW_PAID");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_cancelled_restore_target_to_bad_request() {
        let err = restore_reservation::ExecutionError::NotRestorable(
            reservation::Status::Cancelled,
        )
        .as_error();

        assert_eq!(err.code, "NOT_RESTORABLE");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
