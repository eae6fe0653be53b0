//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::NonTx;

/// Postgres client running every statement inside a single transaction.
///
/// The transaction is opened lazily on the first statement, and rolled back
/// if the client is dropped without [`Tx::commit()`].
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to take a connection from, if the [`NonTx`]
    /// client has none.
    pool: connection::Pool,

    /// Shared state of this client.
    inner: Arc<Inner>,
}

/// Shared state of a [`Tx`] client.
#[derive(Debug)]
pub struct Inner {
    /// [`NonTx`] client whose connection is reused, until taken.
    non_tx: RwLock<Option<NonTx>>,

    /// Open [`connection::Tx`], if any.
    tx: RwLock<Option<connection::Tx>>,
}

impl Tx {
    /// Creates a new [`Tx`] client reusing the connection of the provided
    /// [`NonTx`] client, if it has one.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            inner: Arc::new(Inner {
                non_tx: RwLock::new(Some(client)),
                tx: RwLock::new(None),
            }),
        }
    }

    /// Returns the open [`connection::Tx`], opening it if not yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let read = self.inner.tx.read().await;
        let guard = if read.is_some() {
            read
        } else {
            drop(read);

            let mut write = self.inner.tx.write().await;
            if write.is_none() {
                let reused = match self.inner.non_tx.write().await.take() {
                    Some(client) => client.take_connection().await,
                    None => None,
                };
                let conn = match reused {
                    Some(conn) => conn,
                    None => self
                        .pool
                        .get()
                        .await
                        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                        .map_err(tracerr::map_from)?,
                };

                *write = Some(
                    connection::Tx::from_non_tx(conn)
                        .await
                        .map_err(tracerr::wrap!())?,
                );
                log::trace!("transaction opened");
            }
            write.downgrade()
        };

        Ok(RwLockReadGuard::map(guard, |conn| {
            conn.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }

    /// Commits the transaction of this [`Tx`] client, if it was opened.
    ///
    /// # Errors
    ///
    /// If the database fails to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.inner.tx.write().await.take() else {
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())?;
        log::trace!("transaction committed");
        Ok(())
    }
}

impl Connection for Tx {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }
}
