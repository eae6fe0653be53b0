//! [`Notification`] definitions.

use std::collections::BTreeMap;

use derive_more::Display;

use super::{reservation, user, Invoice, Receipt, Reservation, User};

/// Message delivered to a [`User`] through the notification gateway.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    /// [`Template`] of this [`Notification`].
    pub template: Template,

    /// [`user::Email`] of the recipient.
    pub recipient: user::Email,

    /// Subject line of this [`Notification`].
    pub subject: String,

    /// Body template, with `{name}` placeholders of the
    /// [`Notification::variables`].
    pub body: &'static str,

    /// Values substituted into the [`Notification::body`].
    pub variables: BTreeMap<&'static str, String>,
}

impl Notification {
    /// Creates a new [`Notification`] for the provided [`User`].
    fn new(
        template: Template,
        user: &User,
        subject: impl Into<String>,
        body: &'static str,
    ) -> Self {
        let mut variables = BTreeMap::new();
        _ = variables.insert("name", user.full_name());
        Self {
            template,
            recipient: user.email.clone(),
            subject: subject.into(),
            body,
            variables,
        }
    }

    /// Adds the provided variable to this [`Notification`].
    #[must_use]
    fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        _ = self.variables.insert(name, value.to_string());
        self
    }

    /// Adds the [`Reservation`] details to this [`Notification`].
    fn with_reservation(self, r: &Reservation) -> Self {
        self.with("reservation_id", r.id)
            .with("starts_at", r.starts_at.coerce::<()>().format())
            .with("ends_at", r.ends_at.coerce::<()>().format())
            .with("event_type", r.event_type)
            .with("seats", r.seats)
            .with("total_price", r.total_price)
            .with("status", r.status)
    }

    /// Notifies about a new [`Reservation`].
    #[must_use]
    pub fn reservation_created(r: &Reservation, user: &User) -> Self {
        Self::new(
            Template::ReservationCreated,
            user,
            "Reservation Received",
            "Dear {name}, we have received your reservation #{reservation_id} \
             for {starts_at} - {ends_at}. Total price: {total_price}.",
        )
        .with_reservation(r)
    }

    /// Notifies about changed [`Reservation`] details.
    #[must_use]
    pub fn reservation_updated(r: &Reservation, user: &User) -> Self {
        Self::new(
            Template::ReservationUpdated,
            user,
            "Reservation Updated",
            "Dear {name}, your reservation #{reservation_id} was updated: \
             {starts_at} - {ends_at}, {seats} seats. \
             Total price: {total_price}.",
        )
        .with_reservation(r)
    }

    /// Notifies about a cancelled [`Reservation`].
    #[must_use]
    pub fn reservation_cancelled(r: &Reservation, user: &User) -> Self {
        Self::new(
            Template::ReservationCancelled,
            user,
            "Reservation Cancelled",
            "Dear {name}, your reservation #{reservation_id} for {starts_at} \
             was cancelled.",
        )
        .with_reservation(r)
    }

    /// Notifies about a restored [`Reservation`].
    #[must_use]
    pub fn reservation_restored(r: &Reservation, user: &User) -> Self {
        Self::new(
            Template::ReservationRestored,
            user,
            "Reservation Restored",
            "Dear {name}, your reservation #{reservation_id} for {starts_at} \
             was restored and is {status} now.",
        )
        .with_reservation(r)
    }

    /// Notifies about a [`Reservation`] moved to its current
    /// [`reservation::Status`].
    #[must_use]
    pub fn status_changed(r: &Reservation, user: &User) -> Self {
        let (subject, body) = status_message(r.status);
        Self::new(Template::ReservationStatusChanged, user, subject, body)
            .with_reservation(r)
    }

    /// Notifies about changed [`Invoice`] details.
    #[must_use]
    pub fn invoice_updated(invoice: &Invoice, user: &User) -> Self {
        Self::new(
            Template::InvoiceUpdated,
            user,
            format!("Invoice {} Updated", invoice.number),
            "Dear {name}, invoice {invoice_number} is {invoice_status} now. \
             Amount due: {amount_due}, due by {due_at}.",
        )
        .with("invoice_number", &invoice.number)
        .with("invoice_status", invoice.status)
        .with("amount_due", invoice.amount_due)
        .with("total_amount_paid", invoice.total_amount_paid)
        .with("due_at", invoice.due_at.coerce::<()>().format())
    }

    /// Notifies about an issued [`Receipt`].
    #[must_use]
    pub fn receipt_issued(
        receipt: &Receipt,
        invoice: &Invoice,
        user: &User,
    ) -> Self {
        Self::new(
            Template::ReceiptIssued,
            user,
            format!("Payment Receipt {}", receipt.number),
            "Dear {name}, we have received {amount_paid} for invoice \
             {invoice_number}. Balance due: {balance_due}.",
        )
        .with("receipt_number", &receipt.number)
        .with("invoice_number", &invoice.number)
        .with("amount_paid", receipt.amount_paid)
        .with("balance_due", receipt.balance_due)
        .with("invoice_status", invoice.status)
    }

    /// Renders the [`Notification::body`] with its variables.
    ///
    /// Unknown placeholders are left intact.
    #[must_use]
    pub fn render(&self) -> String {
        self.variables
            .iter()
            .fold(self.body.to_owned(), |body, (name, value)| {
                body.replace(&format!("{{{name}}}"), value)
            })
    }
}

/// Template of a [`Notification`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Template {
    /// [`Notification::reservation_created`].
    ReservationCreated,

    /// [`Notification::reservation_updated`].
    ReservationUpdated,

    /// [`Notification::reservation_cancelled`].
    ReservationCancelled,

    /// [`Notification::reservation_restored`].
    ReservationRestored,

    /// [`Notification::status_changed`].
    ReservationStatusChanged,

    /// [`Notification::invoice_updated`].
    InvoiceUpdated,

    /// [`Notification::receipt_issued`].
    ReceiptIssued,
}

/// Returns the subject and the body template announcing a
/// [`Reservation`] in the provided [`reservation::Status`].
#[must_use]
pub const fn status_message(
    status: reservation::Status,
) -> (&'static str, &'static str) {
    use reservation::Status as S;

    match status {
        S::Pending => (
            "Reservation Pending",
            "Dear {name}, your reservation #{reservation_id} is pending \
             review.",
        ),
        S::Requested => (
            "Reservation Requested",
            "Dear {name}, your reservation #{reservation_id} for {starts_at} \
             is requested.",
        ),
        S::Booked => (
            "Reservation Approved",
            "Dear {name}, your reservation #{reservation_id} for {starts_at} \
             is approved and booked.",
        ),
        S::Confirmed => (
            "Reservation Confirmed",
            "Dear {name}, your reservation #{reservation_id} for {starts_at} \
             is confirmed.",
        ),
        S::InProgress => (
            "Event In Progress",
            "Dear {name}, your event #{reservation_id} is in progress. Enjoy!",
        ),
        S::Done => (
            "Event Done",
            "Dear {name}, your event #{reservation_id} is over. Thank you for \
             celebrating with us!",
        ),
        S::Settled => (
            "Reservation Settled",
            "Dear {name}, your reservation #{reservation_id} is settled up.",
        ),
        S::Completed => (
            "Reservation Completed",
            "Dear {name}, your reservation #{reservation_id} is completed.",
        ),
        S::Cancelled => (
            "Reservation Cancelled",
            "Dear {name}, your reservation #{reservation_id} for {starts_at} \
             was cancelled.",
        ),
    }
}
