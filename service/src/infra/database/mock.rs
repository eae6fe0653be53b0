//! In-memory [`Database`] used in tests.
//!
//! [`Transact`] shares the same state instead of isolating it, so nothing is
//! rolled back on a failed command.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tracerr::Traced;

use crate::{
    domain::{
        add_on, discount, invoice, rate, receipt, reservation, user, AddOn,
        Discount, Invoice, Receipt, Reservation, User,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    read::{reservation::Occupied, NextId},
};

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Mock(Arc<Mutex<State>>);

/// Stored state of a [`Mock`].
#[derive(Debug, Default)]
struct State {
    users: HashMap<user::Id, User>,
    add_ons: BTreeMap<add_on::Id, AddOn>,
    rates: HashMap<rate::Id, rate::Snapshot>,
    discounts: HashMap<discount::Id, Discount>,
    reservations: BTreeMap<reservation::Id, Reservation>,
    invoices: BTreeMap<invoice::Id, Invoice>,
    receipts: BTreeMap<receipt::Id, Receipt>,
    sequences: HashMap<&'static str, i64>,
    locks: usize,
}

impl State {
    fn next(&mut self, sequence: &'static str) -> i64 {
        let id = self.sequences.entry(sequence).or_default();
        *id += 1;
        *id
    }
}

impl Mock {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    /// Stores the provided [`User`].
    pub fn add_user(&self, user: User) {
        _ = self.state().users.insert(user.id.clone(), user);
    }

    /// Stores the provided [`AddOn`].
    pub fn add_add_on(&self, add_on: AddOn) {
        _ = self.state().add_ons.insert(add_on.id, add_on);
    }

    /// Returns the stored [`Reservation`], if any.
    pub fn reservation(&self, id: reservation::Id) -> Option<Reservation> {
        self.state().reservations.get(&id).cloned()
    }

    /// Returns the stored [`Invoice`] of the [`Reservation`], if any.
    pub fn invoice_of(&self, id: reservation::Id) -> Option<Invoice> {
        self.state()
            .invoices
            .values()
            .find(|i| i.reservation_id == id)
            .cloned()
    }

    /// Returns all the stored [`Receipt`]s.
    pub fn receipts(&self) -> Vec<Receipt> {
        self.state().receipts.values().cloned().collect()
    }

    /// Returns the number of stored [`rate::Snapshot`]s.
    pub fn rates_count(&self) -> usize {
        self.state().rates.len()
    }

    /// Returns the number of stored [`Discount`]s.
    pub fn discounts_count(&self) -> usize {
        self.state().discounts.len()
    }

    /// Returns the number of taken calendar locks.
    pub fn locks_count(&self) -> usize {
        self.state().locks
    }
}

impl Database<Transact> for Mock {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Lock<By<Reservation, reservation::Calendar>>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Reservation, reservation::Calendar>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.state().locks += 1;
        Ok(())
    }
}

impl Database<Lock<By<Invoice, invoice::Id>>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Invoice, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.state().locks += 1;
        Ok(())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Mock {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().users.get(by.inner()).cloned())
    }
}

impl<IDs> Database<Select<By<HashMap<add_on::Id, AddOn>, IDs>>> for Mock
where
    IDs: AsRef<[add_on::Id]>,
{
    type Ok = HashMap<add_on::Id, AddOn>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<add_on::Id, AddOn>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state();
        Ok(by
            .inner()
            .as_ref()
            .iter()
            .filter_map(|id| state.add_ons.get(id))
            .map(|a| (a.id, a.clone()))
            .collect())
    }
}

impl<Names> Database<Select<By<HashMap<add_on::Name, AddOn>, Names>>> for Mock
where
    Names: AsRef<[add_on::Name]>,
{
    type Ok = HashMap<add_on::Name, AddOn>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<add_on::Name, AddOn>, Names>>,
    ) -> Result<Self::Ok, Self::Err> {
        let names = by.inner().as_ref();
        Ok(self
            .state()
            .add_ons
            .values()
            .filter(|a| names.contains(&a.name))
            .map(|a| (a.name.clone(), a.clone()))
            .collect())
    }
}

impl Database<Insert<rate::Snapshot>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(rates): Insert<rate::Snapshot>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().rates.entry(rates.id()).or_insert(rates);
        Ok(())
    }
}

impl Database<Insert<Discount>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(discount): Insert<Discount>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self
            .state()
            .discounts
            .entry(discount.id())
            .or_insert(discount);
        Ok(())
    }
}

impl Database<Select<By<reservation::Id, NextId>>> for Mock {
    type Ok = reservation::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<reservation::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().next("reservations").into())
    }
}

impl<IDs> Database<Select<By<HashMap<reservation::Id, Reservation>, IDs>>>
    for Mock
where
    IDs: AsRef<[reservation::Id]>,
{
    type Ok = HashMap<reservation::Id, Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<reservation::Id, Reservation>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state();
        Ok(by
            .inner()
            .as_ref()
            .iter()
            .filter_map(|id| state.reservations.get(id))
            .map(|r| (r.id, r.clone()))
            .collect())
    }
}

impl Database<Select<By<Option<Reservation>, reservation::Id>>> for Mock {
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.reservation(by.into_inner()))
    }
}

impl Database<Select<By<Vec<Occupied>, reservation::Window>>> for Mock {
    type Ok = Vec<Occupied>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Occupied>, reservation::Window>>,
    ) -> Result<Self::Ok, Self::Err> {
        let window = by.into_inner();
        Ok(self
            .state()
            .reservations
            .values()
            .filter(|r| r.is_occupying() && r.window().overlaps(&window))
            .map(Occupied::from)
            .collect())
    }
}

impl Database<Insert<Reservation>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        if state.reservations.contains_key(&reservation.id) {
            return Err(tracerr::new!(database::Error::Violated(
                constraint::RESERVATION_ID
            )));
        }
        _ = state.reservations.insert(reservation.id, reservation);
        Ok(())
    }
}

impl Database<Update<Reservation>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        if let Some(stored) =
            self.state().reservations.get_mut(&reservation.id)
        {
            *stored = reservation;
        }
        Ok(())
    }
}

impl Database<Select<By<invoice::Id, NextId>>> for Mock {
    type Ok = invoice::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<invoice::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().next("invoices").into())
    }
}

impl Database<Select<By<Option<Invoice>, invoice::Id>>> for Mock {
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().invoices.get(by.inner()).cloned())
    }
}

impl Database<Select<By<Option<Invoice>, reservation::Id>>> for Mock {
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.invoice_of(by.into_inner()))
    }
}

impl Database<Insert<Invoice>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(invoice): Insert<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(invoice)).await
    }
}

impl Database<Update<Invoice>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(invoice): Update<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().invoices.insert(invoice.id, invoice);
        Ok(())
    }
}

impl Database<Select<By<receipt::Id, NextId>>> for Mock {
    type Ok = receipt::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<receipt::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().next("receipts").into())
    }
}

impl Database<Select<By<receipt::payment::Id, NextId>>> for Mock {
    type Ok = receipt::payment::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<receipt::payment::Id, NextId>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().next("payments").into())
    }
}

impl Database<Select<By<Vec<Receipt>, invoice::Id>>> for Mock {
    type Ok = Vec<Receipt>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Receipt>, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let invoice_id = by.into_inner();
        Ok(self
            .state()
            .receipts
            .values()
            .filter(|r| r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

impl Database<Insert<Receipt>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(receipt): Insert<Receipt>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().receipts.insert(receipt.id, receipt);
        Ok(())
    }
}
