//! [`Receipt`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLInputObject, GraphQLScalar};
use service::{command, domain};

use crate::{api, api::scalar, Context};

/// A receipt of a single payment session.
#[derive(Clone, Debug, From)]
pub struct Receipt(domain::Receipt);

/// A receipt of a single payment session.
#[graphql_object(context = Context)]
impl Receipt {
    /// Unique identifier of this `Receipt`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Human-readable number of this `Receipt`.
    #[must_use]
    pub fn number(&self) -> String {
        self.0.number.to_string()
    }

    /// `DateTime` when this `Receipt` was issued.
    #[must_use]
    pub fn issued_at(&self) -> DateTime {
        self.0.issued_at.coerce()
    }

    /// Amount paid in this session.
    #[must_use]
    pub fn amount_paid(&self) -> Money {
        self.0.amount_paid
    }

    /// Identifier of the paid `Reservation`.
    #[must_use]
    pub fn reservation_id(&self) -> api::reservation::Id {
        self.0.reservation_id.into()
    }

    /// Identifier of the paying `User`.
    #[must_use]
    pub fn user_id(&self) -> api::reservation::UserId {
        self.0.user_id.clone().into()
    }

    /// Identifier of the paid `Invoice`.
    #[must_use]
    pub fn invoice_id(&self) -> api::invoice::Id {
        self.0.invoice_id.into()
    }

    /// `Payment`s made in this session.
    #[must_use]
    pub fn payments(&self) -> Vec<Payment> {
        self.0.payments.iter().cloned().map(Into::into).collect()
    }

    /// Amount paid for the `Invoice` including this session.
    #[must_use]
    pub fn total_amount_paid_till_today(&self) -> Money {
        self.0.total_amount_paid_till_today
    }

    /// Name of the payer.
    #[must_use]
    pub fn paid_by(&self) -> Name {
        self.0.paid_by.clone().into()
    }

    /// `DateTime` of the payment.
    #[must_use]
    pub fn paid_at(&self) -> DateTime {
        self.0.paid_at.coerce()
    }

    /// Amount due before this session.
    #[must_use]
    pub fn prev_balance(&self) -> Money {
        self.0.prev_balance
    }

    /// Amount due after this session.
    #[must_use]
    pub fn balance_due(&self) -> Money {
        self.0.balance_due
    }

    /// Name of the cashier accepting the payment.
    #[must_use]
    pub fn cashier_name(&self) -> Name {
        self.0.cashier_name.clone().into()
    }
}

/// A single payment made within a `Receipt` session.
#[derive(Clone, Debug, From)]
pub struct Payment(domain::Payment);

/// A single payment made within a `Receipt` session.
#[graphql_object(context = Context)]
impl Payment {
    /// Unique identifier of this `Payment`.
    #[must_use]
    pub fn id(&self) -> PaymentId {
        self.0.id.into()
    }

    /// Method of this `Payment`.
    #[must_use]
    pub fn method(&self) -> PaymentMethod {
        self.0.method.into()
    }

    /// Paid amount.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// Last four digits of the paying card, if paid by card.
    #[must_use]
    pub fn card_last_four(&self) -> Option<CardLastFour> {
        self.0.card_last_four.clone().map(Into::into)
    }

    /// Details of any other payment method.
    #[must_use]
    pub fn other_details(&self) -> Option<PaymentDetails> {
        self.0.other_details.clone().map(Into::into)
    }
}

/// Payment to record.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct PaymentInput {
    /// Method of the payment.
    pub method: PaymentMethod,

    /// Paid amount.
    pub amount: Money,

    /// Last four digits of the paying card, if paid by card.
    pub card_last_four: Option<CardLastFour>,

    /// Details of any other payment method.
    pub other_details: Option<PaymentDetails>,
}

impl From<PaymentInput> for command::create_receipt::NewPayment {
    fn from(input: PaymentInput) -> Self {
        let PaymentInput {
            method,
            amount,
            card_last_four,
            other_details,
        } = input;
        Self {
            method: method.into(),
            amount,
            card_last_four: card_last_four.map(Into::into),
            other_details: other_details.map(Into::into),
        }
    }
}

/// Unique identifier of a `Receipt`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ReceiptId", with = scalar::Via::<domain::receipt::Id>)]
pub struct Id(domain::receipt::Id);

/// Name of a person on a `Receipt`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ReceiptName", with = scalar::Via::<domain::receipt::Name>)]
pub struct Name(domain::receipt::Name);

/// Unique identifier of a `Payment`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::receipt::payment::Id>)]
pub struct PaymentId(domain::receipt::payment::Id);

/// Method of a `Payment`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::receipt::payment::Method>)]
pub struct PaymentMethod(domain::receipt::payment::Method);

/// Last four digits of a card.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::receipt::payment::CardLastFour>)]
pub struct CardLastFour(domain::receipt::payment::CardLastFour);

/// Free-form details of a `Payment`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::receipt::payment::Details>)]
pub struct PaymentDetails(domain::receipt::payment::Details);
