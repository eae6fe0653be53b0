//! [`Command`] for recording a payment session with a new [`Receipt`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Notify, Select, Transact, Transacted, Update,
    },
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        invoice,
        receipt::{self, payment, Rejection},
        reservation, user, Invoice, Notification, Payment, Receipt,
        Reservation, User,
    },
    infra::{database, notifier, Database, Notifier},
    read::NextId,
    Service,
};

use super::Command;

/// [`Command`] for recording a payment session against an [`Invoice`].
///
/// The [`Invoice`] is updated with the paid amount, and a new [`Receipt`]
/// keeps the snapshot of the balances at the moment of payment.
#[derive(Clone, Debug)]
pub struct CreateReceipt {
    /// ID of the [`Invoice`] being paid.
    pub invoice_id: invoice::Id,

    /// [`Payment`]s made in this session.
    pub payments: Vec<NewPayment>,

    /// Name of the payer.
    pub paid_by: receipt::Name,

    /// Time of the payment.
    ///
    /// Current time, if [`None`].
    pub paid_at: Option<receipt::PaymentDateTime>,

    /// Name of the cashier accepting the payment.
    pub cashier_name: receipt::Name,
}

/// [`Payment`] to be recorded.
#[derive(Clone, Debug)]
pub struct NewPayment {
    /// [`payment::Method`] of the [`Payment`].
    pub method: payment::Method,

    /// Paid amount.
    pub amount: Money,

    /// Last four digits of the paying card, if any.
    pub card_last_four: Option<payment::CardLastFour>,

    /// Free-form details of the [`Payment`], if any.
    pub other_details: Option<payment::Details>,
}

impl<Db, Ntf> Command<CreateReceipt> for Service<Db, Ntf>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Invoice, invoice::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Invoice>, invoice::Id>>,
            Ok = Option<Invoice>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Receipt>, invoice::Id>>,
            Ok = Vec<Receipt>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<receipt::Id, NextId>>,
            Ok = receipt::Id,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<payment::Id, NextId>>,
            Ok = payment::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Receipt>, Err = Traced<database::Error>>
        + Database<Update<Invoice>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Notify<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Receipt;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateReceipt) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReceipt {
            invoice_id,
            payments,
            paid_by,
            paid_at,
            cashier_name,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes payments of the same `Invoice`.
        tx.execute(Lock(By::new(invoice_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut invoice = tx
            .execute(Select(By::<Option<Invoice>, _>::new(invoice_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvoiceNotExists(invoice_id))
            .map_err(tracerr::wrap!())?;
        let reservation_id = invoice.reservation_id;
        let reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;

        let issued = tx
            .execute(Select(By::<Vec<Receipt>, _>::new(invoice_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let id = tx
            .execute(Select(By::<receipt::Id, _>::new(NextId)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let mut recorded = Vec::with_capacity(payments.len());
        for p in payments {
            let payment_id = tx
                .execute(Select(By::<payment::Id, _>::new(NextId)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            recorded.push(Payment {
                id: payment_id,
                receipt_id: id,
                method: p.method,
                amount: p.amount,
                card_last_four: p.card_last_four,
                other_details: p.other_details,
            });
        }

        let now = DateTime::now();
        let mut receipt = Receipt {
            id,
            number: receipt::Number::new(
                reservation_id,
                invoice_id,
                issued.len() + 1,
            ),
            issued_at: now.coerce(),
            amount_paid: Money::ZERO,
            reservation_id,
            user_id: invoice.user_id.clone(),
            invoice_id,
            payments: recorded,
            total_amount_paid_till_today: Money::ZERO,
            paid_by,
            paid_at: paid_at.unwrap_or_else(|| now.coerce()),
            prev_balance: Money::ZERO,
            balance_due: Money::ZERO,
            cashier_name,
        };
        receipt
            .apply_to(&mut invoice, reservation.total_price, issued.is_empty())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Insert(receipt.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Update(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Receipt({})` issued for `Invoice(id: {invoice_id})`: paid {}, \
             balance due {}",
            receipt.number,
            receipt.amount_paid,
            receipt.balance_due,
        );

        self.notify_user(&invoice.user_id, |user| {
            vec![
                Notification::receipt_issued(&receipt, &invoice, user),
                Notification::invoice_updated(&invoice, user),
            ]
        })
        .await;

        Ok(receipt)
    }
}

/// Error of [`CreateReceipt`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Invoice`] with the provided ID does not exist.
    #[display("`Invoice(id: {_0})` does not exist")]
    InvoiceNotExists(#[error(not(source))] invoice::Id),

    /// Payment session cannot be applied to the [`Invoice`].
    #[display("{_0}")]
    #[from]
    Rejected(Rejection),

    /// [`Reservation`] of the [`Invoice`] does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{
        command::{
            create_reservation::spec::{create, money, service},
            Command as _, CreateReceipt,
        },
        domain::{
            invoice,
            notification::Template,
            receipt::{self, payment, Rejection},
        },
        infra::notifier::Recorder,
    };

    use super::{ExecutionError, NewPayment};

    fn pay(invoice_id: i64, amounts: &[&str]) -> CreateReceipt {
        CreateReceipt {
            invoice_id: invoice_id.into(),
            payments: amounts
                .iter()
                .map(|a| NewPayment {
                    method: payment::Method::Cash,
                    amount: money(a),
                    card_last_four: None,
                    other_details: None,
                })
                .collect(),
            paid_by: receipt::Name::new("Ana Reyes").unwrap(),
            paid_at: None,
            cashier_name: receipt::Name::new("Front Desk").unwrap(),
        }
    }

    #[tokio::test]
    async fn settles_invoice_in_two_sessions() {
        let notifier = Recorder::default();
        let (service, db) = service(notifier.clone());
        let r = service
            .execute(create(7, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();
        let invoice_id = db.invoice_of(r.id).unwrap().id;
        assert_eq!(i64::from(invoice_id), 1);

        let first = service.execute(pay(1, &["1000"])).await.unwrap();
        assert_eq!(first.number.to_string(), "RR7IN00011");
        assert_eq!(first.amount_paid, money("1000"));
        assert_eq!(first.prev_balance, money("1998"));
        assert_eq!(first.balance_due, money("998"));
        assert_eq!(first.total_amount_paid_till_today, money("1000"));

        let invoice = db.invoice_of(r.id).unwrap();
        assert_eq!(invoice.total_amount_paid, money("1000"));
        assert_eq!(invoice.amount_due, money("998"));
        assert_eq!(invoice.status, invoice::Status::PartiallyPaid);

        let second = service.execute(pay(1, &["500", "498"])).await.unwrap();
        assert_eq!(second.number.to_string(), "RR7IN00012");
        assert_eq!(second.amount_paid, money("998"));
        assert_eq!(second.prev_balance, money("998"));
        assert_eq!(second.balance_due, Money::ZERO);
        assert_eq!(second.total_amount_paid_till_today, money("1998"));
        assert_eq!(second.payments.len(), 2);
        assert!(second.payments.iter().all(|p| p.receipt_id == second.id));

        let invoice = db.invoice_of(r.id).unwrap();
        assert_eq!(invoice.amount_due, Money::ZERO);
        assert_eq!(invoice.status, invoice::Status::Paid);
        assert_eq!(invoice.amount_due + invoice.total_amount_paid, r.total_price);

        assert_eq!(db.receipts().len(), 2);
        assert_eq!(
            notifier.templates()[2..4],
            [Template::ReceiptIssued, Template::InvoiceUpdated],
        );
    }

    #[tokio::test]
    async fn rejects_overpayment() {
        let (service, db) = service(Recorder::default());
        let r = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let err = service.execute(pay(1, &["2000"])).await.unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Rejected(Rejection::Overpayment { .. }),
            ),
            "{err}",
        );
        let invoice = db.invoice_of(r.id).unwrap();
        assert_eq!(invoice.amount_due, money("1998"));
        assert_eq!(invoice.total_amount_paid, Money::ZERO);
        assert!(db.receipts().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_session() {
        let (service, _) = service(Recorder::default());
        _ = service
            .execute(create(1, "2099-06-01, 06:00 PM", "2099-06-01, 11:00 PM"))
            .await
            .unwrap();

        let err = service.execute(pay(1, &[])).await.unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Rejected(Rejection::NoPayments),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn requires_existing_invoice() {
        let (service, _) = service(Recorder::default());

        let err = service.execute(pay(3, &["10"])).await.unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::InvoiceNotExists(_)),
            "{err}",
        );
    }
}
