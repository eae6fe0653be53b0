//! [`Reservation`]-related definitions.

use common::{DateTime, Money, Percent};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLInputObject, GraphQLScalar};
use service::{command, domain, pricing, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, define_error, AsError, Context, Error};

/// A reservation of the venue.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// Underlying [`domain::Reservation`].
    reservation: domain::Reservation,

    /// [`domain::Invoice`] of this [`Reservation`], if loaded.
    invoice: OnceCell<Option<domain::Invoice>>,
}

impl From<domain::Reservation> for Reservation {
    fn from(reservation: domain::Reservation) -> Self {
        Self {
            reservation,
            invoice: OnceCell::new(),
        }
    }
}

impl Reservation {
    /// Returns the [`domain::Invoice`] of this [`Reservation`], if any.
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Invoice`] cannot be loaded.
    async fn load_invoice(
        &self,
        ctx: &Context,
    ) -> Result<Option<&domain::Invoice>, Error> {
        let id = self.reservation.id;
        self.invoice
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::invoice::ByReservationId::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
            })
            .await
            .map(Option::as_ref)
    }
}

/// A reservation of the venue.
#[graphql_object(context = Context)]
impl Reservation {
    /// Unique identifier of this `Reservation`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.reservation.id.into()
    }

    /// Identifier of the `User` owning this `Reservation`.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.reservation.user_id.clone().into()
    }

    /// `DateTime` when the event starts.
    #[must_use]
    pub fn starts_at(&self) -> DateTime {
        self.reservation.starts_at.coerce()
    }

    /// `DateTime` when the event is scheduled to end.
    #[must_use]
    pub fn ends_at(&self) -> DateTime {
        self.reservation.ends_at.coerce()
    }

    /// `DateTime` when the event actually ended, if known.
    #[must_use]
    pub fn effectively_ends_at(&self) -> Option<DateTime> {
        self.reservation.effectively_ends_at.map(|at| at.coerce())
    }

    /// Number of booked seats.
    #[must_use]
    pub fn seats(&self) -> i32 {
        self.reservation.seats.get().into()
    }

    /// Type of the event.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.reservation.event_type.into()
    }

    /// Indicator whether the full package is booked.
    #[must_use]
    pub fn is_full_package(&self) -> bool {
        self.reservation.is_full_package
    }

    /// Catalog add-ons requested by this `Reservation`.
    #[must_use]
    pub fn add_ons(&self) -> Vec<RequestedAddOn> {
        self.reservation
            .add_ons
            .iter()
            .copied()
            .map(Into::into)
            .collect()
    }

    /// Total cost of the requested add-ons.
    #[must_use]
    pub fn add_ons_total_cost(&self) -> Money {
        self.reservation.add_ons_total_cost
    }

    /// Current status of this `Reservation`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.reservation.status.into()
    }

    /// Indicator whether the security deposit is refunded.
    #[must_use]
    pub fn is_security_deposit_refunded(&self) -> bool {
        self.reservation.is_security_deposit_refunded
    }

    /// Applied tax rate, if any.
    #[must_use]
    pub fn tax_rate(&self) -> Option<TaxRate> {
        self.reservation.tax_rate.map(Into::into)
    }

    /// Total price of this `Reservation`.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.reservation.total_price
    }

    /// Rates the `totalPrice` was computed with.
    #[must_use]
    pub fn rates(&self) -> RateSnapshot {
        self.reservation.rates.into()
    }

    /// Applied discount, if any.
    #[must_use]
    pub fn discount(&self) -> Option<Discount> {
        self.reservation.discount.clone().map(Into::into)
    }

    /// Way the `totalPrice` was requested to be computed.
    #[must_use]
    pub fn price_computation_method(&self) -> PriceComputationMethod {
        self.reservation.price_computation_method.into()
    }

    /// `Invoice` issued for this `Reservation`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Reservation.invoice",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn invoice(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Invoice>, Error> {
        Ok(self.load_invoice(ctx).await?.cloned().map(Into::into))
    }
}

/// Catalog add-on requested by a `Reservation`.
#[derive(Clone, Copy, Debug, From)]
pub struct RequestedAddOn(domain::reservation::RequestedAddOn);

/// Catalog add-on requested by a `Reservation`.
#[graphql_object(context = Context)]
impl RequestedAddOn {
    /// Identifier of the requested `AddOn`.
    #[must_use]
    pub fn add_on_id(&self) -> AddOnId {
        self.0.add_on_id.into()
    }

    /// Requested quantity.
    #[must_use]
    pub fn quantity(&self) -> i32 {
        self.0.quantity.into()
    }
}

/// Frozen rates a `Reservation` price was computed with.
#[derive(Clone, Copy, Debug, From)]
pub struct RateSnapshot(domain::rate::Snapshot);

/// Frozen rates a `Reservation` price was computed with.
#[graphql_object(context = Context)]
impl RateSnapshot {
    /// Content-addressed identifier of this `RateSnapshot`.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.0.id().into()
    }

    /// Price of a single seat.
    #[must_use]
    pub fn seat(&self) -> Money {
        self.0.seat
    }

    /// Facility fee of the event day.
    #[must_use]
    pub fn facility(&self) -> Money {
        self.0.facility
    }

    /// Price of a single overtime hour.
    #[must_use]
    pub fn overtime(&self) -> Money {
        self.0.overtime
    }

    /// Cleaning fee.
    #[must_use]
    pub fn cleaning(&self) -> Money {
        self.0.cleaning
    }
}

/// Discount applied to a `Reservation`.
#[derive(Clone, Debug, From)]
pub struct Discount(domain::Discount);

/// Discount applied to a `Reservation`.
#[graphql_object(context = Context)]
impl Discount {
    /// Content-addressed identifier of this `Discount`.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.0.id().into()
    }

    /// Percentage taken off the subtotal, if it's a percentage `Discount`.
    #[must_use]
    pub fn percentage(&self) -> Option<Percent> {
        match self.0.value {
            domain::discount::Value::Percentage(p) => Some(p),
            domain::discount::Value::Amount(_) => None,
        }
    }

    /// Amount taken off the subtotal, if it's a fixed `Discount`.
    #[must_use]
    pub fn amount(&self) -> Option<Money> {
        match self.0.value {
            domain::discount::Value::Amount(a) => Some(a),
            domain::discount::Value::Percentage(_) => None,
        }
    }

    /// Name of this `Discount`.
    #[must_use]
    pub fn name(&self) -> DiscountName {
        self.0.name.clone().into()
    }

    /// Promotional code of this `Discount`.
    #[must_use]
    pub fn code(&self) -> DiscountCode {
        self.0.code.clone().into()
    }

    /// Indicator whether this `Discount` is still offered.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.0.is_available
    }

    /// Description of this `Discount`, if any.
    #[must_use]
    pub fn description(&self) -> Option<DiscountDescription> {
        self.0.description.clone().map(Into::into)
    }
}

/// Unique identifier of a `Reservation`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ReservationId",
    with = scalar::Via::<domain::reservation::Id>,
)]
pub struct Id(domain::reservation::Id);

/// Identifier of a `User` issued by the user directory.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "UserId", with = scalar::Via::<domain::user::Id>)]
pub struct UserId(domain::user::Id);

/// Unique identifier of a catalog `AddOn`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "AddOnId", with = scalar::Via::<domain::add_on::Id>)]
pub struct AddOnId(domain::add_on::Id);

/// Lifecycle status of a `Reservation`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ReservationStatus",
    with = scalar::Via::<domain::reservation::Status>,
)]
pub struct Status(domain::reservation::Status);

/// Type of the event a `Reservation` is made for.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::reservation::EventType>)]
pub struct EventType(domain::reservation::EventType);

/// Way the price of a `Reservation` is computed.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::reservation::PriceComputationMethod>)]
pub struct PriceComputationMethod(domain::reservation::PriceComputationMethod);

/// Tax rate as a fraction of one (e.g. `"0.08"` for 8%).
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::reservation::TaxRate>)]
pub struct TaxRate(domain::reservation::TaxRate);

/// Name of a `Discount`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::discount::Name>)]
pub struct DiscountName(domain::discount::Name);

/// Promotional code of a `Discount`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::discount::Code>)]
pub struct DiscountCode(domain::discount::Code);

/// Description of a `Discount`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::discount::Description>)]
pub struct DiscountDescription(domain::discount::Description);

define_error! {
    enum InputError {
        #[code = "INVALID_SEAT_COUNT"]
        #[status = BAD_REQUEST]
        #[message = "Seat count exceeds the venue capacity"]
        SeatCount,

        #[code = "AMBIGUOUS_DISCOUNT_VALUE"]
        #[status = BAD_REQUEST]
        #[message = "Exactly one of `percentage` or `amount` must be \
                     provided"]
        DiscountValue,
    }
}

/// Booking details of a `Reservation`.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct BookingInput {
    /// `DateTime` when the event starts.
    pub starts_at: DateTime,

    /// `DateTime` when the event is scheduled to end.
    pub ends_at: DateTime,

    /// `DateTime` when the event actually ended, if known.
    pub effectively_ends_at: Option<DateTime>,

    /// Number of booked seats.
    pub seats: i32,

    /// Type of the event.
    pub event_type: EventType,

    /// Indicator whether the full package is booked.
    #[graphql(default)]
    pub is_full_package: bool,

    /// Requested catalog add-ons.
    #[graphql(default)]
    pub add_ons: Vec<AddOnInput>,

    /// Indicator whether the security deposit is refunded.
    #[graphql(default)]
    pub is_security_deposit_refunded: bool,

    /// Applied tax rate, if any.
    pub tax_rate: Option<TaxRate>,

    /// Applied discount, if any.
    pub discount: Option<DiscountInput>,

    /// Way the price is requested to be computed.
    ///
    /// `Auto`, if omitted.
    pub price_computation_method: Option<PriceComputationMethod>,
}

impl TryFrom<BookingInput> for command::create_reservation::Booking {
    type Error = Error;

    fn try_from(input: BookingInput) -> Result<Self, Self::Error> {
        let BookingInput {
            starts_at,
            ends_at,
            effectively_ends_at,
            seats,
            event_type,
            is_full_package,
            add_ons,
            is_security_deposit_refunded,
            tax_rate,
            discount,
            price_computation_method,
        } = input;

        Ok(Self {
            starts_at: starts_at.coerce(),
            ends_at: ends_at.coerce(),
            effectively_ends_at: effectively_ends_at.map(DateTime::coerce),
            seats: seat_count(seats)?,
            event_type: event_type.into(),
            is_full_package,
            add_ons: add_ons
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            is_security_deposit_refunded,
            tax_rate: tax_rate.map(Into::into),
            discount: discount.map(TryInto::try_into).transpose()?,
            price_computation_method: price_computation_method.map_or(
                domain::reservation::PriceComputationMethod::Auto,
                Into::into,
            ),
        })
    }
}

/// Inputs of a price quote.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct QuoteInput {
    /// `DateTime` when the event starts.
    pub starts_at: DateTime,

    /// `DateTime` when the event is scheduled to end.
    pub ends_at: DateTime,

    /// `DateTime` when the event actually ends, if known.
    pub effectively_ends_at: Option<DateTime>,

    /// Number of seats.
    pub seats: i32,

    /// Requested catalog add-ons.
    #[graphql(default)]
    pub add_ons: Vec<AddOnInput>,

    /// Tax rate to apply, if any.
    pub tax_rate: Option<TaxRate>,

    /// Discount to apply, if any.
    pub discount: Option<DiscountInput>,
}

impl TryFrom<QuoteInput> for pricing::Input {
    type Error = Error;

    fn try_from(input: QuoteInput) -> Result<Self, Self::Error> {
        let QuoteInput {
            starts_at,
            ends_at,
            effectively_ends_at,
            seats,
            add_ons,
            tax_rate,
            discount,
        } = input;

        Ok(Self {
            starts_at: starts_at.coerce(),
            ends_at: ends_at.coerce(),
            effectively_ends_at: effectively_ends_at.map(DateTime::coerce),
            seats: seat_count(seats)?,
            add_ons: add_ons
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            discount: discount.map(TryInto::try_into).transpose()?,
            tax_rate: tax_rate.map(Into::into),
        })
    }
}

/// Catalog add-on to request.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
pub struct AddOnInput {
    /// Identifier of the `AddOn`.
    pub add_on_id: AddOnId,

    /// Requested quantity.
    pub quantity: i32,
}

impl TryFrom<AddOnInput> for domain::reservation::RequestedAddOn {
    type Error = Error;

    fn try_from(input: AddOnInput) -> Result<Self, Self::Error> {
        Ok(Self {
            add_on_id: input.add_on_id.into(),
            quantity: scalar::count(input.quantity)?,
        })
    }
}

/// Discount to apply.
///
/// Exactly one of `percentage` or `amount` must be provided.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct DiscountInput {
    /// Percentage taken off the subtotal.
    pub percentage: Option<Percent>,

    /// Amount taken off the subtotal.
    pub amount: Option<Money>,

    /// Name of the discount.
    pub name: DiscountName,

    /// Promotional code of the discount.
    pub code: DiscountCode,

    /// Indicator whether the discount is still offered.
    #[graphql(default = true)]
    pub is_available: bool,

    /// Description of the discount.
    pub description: Option<DiscountDescription>,
}

impl TryFrom<DiscountInput> for domain::Discount {
    type Error = Error;

    fn try_from(input: DiscountInput) -> Result<Self, Self::Error> {
        use domain::discount::Value;

        let DiscountInput {
            percentage,
            amount,
            name,
            code,
            is_available,
            description,
        } = input;

        let value = match (percentage, amount) {
            (Some(p), None) => Value::Percentage(p),
            (None, Some(a)) => Value::Amount(a),
            (Some(_), Some(_)) | (None, None) => {
                return Err(InputError::DiscountValue.into());
            }
        };
        Ok(Self {
            value,
            name: name.into(),
            code: code.into(),
            is_available,
            description: description.map(Into::into),
        })
    }
}

/// Converts a GraphQL seats input into a [`domain::reservation::SeatCount`].
fn seat_count(seats: i32) -> Result<domain::reservation::SeatCount, Error> {
    domain::reservation::SeatCount::new(scalar::count(seats)?)
        .ok_or_else(|| InputError::SeatCount.into())
}

pub mod batch {
    //! Definitions related to the [`Reservation`]s batch commands.
    //!
    //! [`Reservation`]: super::Reservation

    use juniper::graphql_object;
    use service::command;

    use super::Id;
    use crate::{Context, Error};

    /// Outcome of a command applied to multiple [`Reservation`]s.
    ///
    /// [`Reservation`]: super::Reservation
    #[derive(Clone, Debug)]
    pub struct Outcome(command::Outcome);

    impl From<command::Outcome> for Outcome {
        fn from(outcome: command::Outcome) -> Self {
            Self(outcome)
        }
    }

    impl Outcome {
        /// Checks whether the command succeeded for every requested ID.
        #[must_use]
        pub fn is_complete(&self) -> bool {
            self.0.failed.is_empty()
        }

        /// Returns the [`Error`] naming the `failed` IDs, if any.
        #[must_use]
        pub fn failure(&self) -> Option<Error> {
            (!self.is_complete()).then(|| {
                Error::bad_request(
                    "RESERVATIONS_FAILED",
                    &format!(
                        "`Reservation`s failed: {}",
                        self.0.failed_list(),
                    ),
                )
            })
        }
    }

    /// Outcome of a command applied to multiple `Reservation`s
    /// independently.
    #[graphql_object(name = "ReservationBatchOutcome", context = Context)]
    impl Outcome {
        /// IDs of the `Reservation`s the command succeeded for.
        #[must_use]
        pub fn succeeded(&self) -> Vec<Id> {
            self.0.succeeded.iter().copied().map(Into::into).collect()
        }

        /// Sorted IDs the command failed for.
        #[must_use]
        pub fn failed(&self) -> Vec<Id> {
            self.0.failed.iter().copied().map(Into::into).collect()
        }

        /// Indicator whether the command succeeded for every requested ID.
        ///
        /// # Errors
        ///
        /// Possible error codes:
        /// - `RESERVATIONS_FAILED` - the command failed for some IDs, either
        ///                           not existing or rejected on their own,
        ///                           and the message names them.
        pub fn complete(&self, ctx: &Context) -> Result<Option<bool>, Error> {
            match self.failure() {
                None => Ok(Some(true)),
                Some(err) => {
                    ctx.set_error_status_code(err.status_code);
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use service::command;

    use super::batch::Outcome;

    #[test]
    fn complete_batch_has_no_failure() {
        let outcome = Outcome::from(command::Outcome {
            succeeded: vec![1.into(), 2.into()],
            failed: vec![],
        });

        assert!(outcome.is_complete());
        assert!(outcome.failure().is_none());
    }

    #[test]
    fn names_failed_ids_whatever_the_cause() {
        let outcome = Outcome::from(command::Outcome {
            succeeded: vec![4.into()],
            failed: vec![3.into(), 5.into()],
        });

        let err = outcome.failure().expect("batch is not complete");
        assert_eq!(err.code, "RESERVATIONS_FAILED");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "`Reservation`s failed: 3, 5");
    }
}
