//! Transactional execution client
//!
//! Every call runs on the transaction's connection. Exec batches never
//! commit or roll back; the caller decides, so work across several entity
//! types can form one atomic unit:
//!
//! ```ignore
//! let mut tx = db.begin(TxOptions::default()).await?;
//! tx.exec_raws("signup", &[ExecRaw::new(&team, TeamOp::Create)]).await?;
//! tx.exec_raws_consistent("signup", &[ExecRaw::new(&user, UserOp::JoinTeam)]).await?;
//! tx.commit().await?;
//! ```
//!
//! A handle is `Active` until `commit` or `rollback`, then `Terminated`.
//! Dropping an active handle rolls it back.

use async_trait::async_trait;
use sqlx::any::Any;
use sqlx::AnyConnection;
use sqlx::Transaction;
use tracing::{debug, instrument, warn};

use crate::entity::{short_type_name, Consistency, Entity, ExecRaw};
use crate::{scan, Database, DbError, Result};

/// Transaction-backed handle. Used through `&mut`, so one caller at a time.
pub struct Tx {
    inner: Option<Transaction<'static, Any>>,
}

impl Tx {
    pub(crate) fn new(inner: Transaction<'static, Any>) -> Self {
        Self { inner: Some(inner) }
    }

    /// False once the handle has been committed or rolled back.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Commit and terminate the handle.
    ///
    /// Fails with [`DbError::TxDone`] if the handle is already terminated.
    /// The handle is terminated even when the commit itself fails.
    pub async fn commit(&mut self) -> Result<()> {
        let tx = self.inner.take().ok_or(DbError::TxDone)?;
        tx.commit().await?;
        Ok(())
    }

    /// Roll back and terminate the handle.
    ///
    /// Safe to call unconditionally as a cleanup step: a no-op on a
    /// terminated handle, and driver failures are logged rather than returned.
    pub async fn rollback(&mut self) {
        let Some(tx) = self.inner.take() else {
            debug!("rollback on terminated transaction ignored");
            return;
        };
        if let Err(err) = tx.rollback().await {
            warn!(error = %err, "transaction rollback failed");
        }
    }

    fn conn(&mut self) -> Result<&mut AnyConnection> {
        self.inner.as_deref_mut().ok_or(DbError::TxDone)
    }
}

impl std::fmt::Debug for Tx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx").field("active", &self.is_active()).finish()
    }
}

#[async_trait]
impl Database for Tx {
    #[instrument(skip_all, fields(entity = short_type_name::<E>(), op = ?op))]
    async fn query_raw<E: Entity>(&mut self, entity: &mut E, op: E::Op) -> Result<()> {
        scan::fetch_one(self.conn()?, entity, op).await
    }

    #[instrument(skip_all, fields(entity = short_type_name::<E>(), op = ?op))]
    async fn query_multi_raw<E: Entity>(&mut self, entity: E, op: E::Op) -> Result<Vec<E>> {
        scan::fetch_all(self.conn()?, entity, op).await
    }

    #[instrument(skip_all, fields(source = source, statements = raws.len()))]
    async fn exec_raws(&mut self, source: &str, raws: &[ExecRaw<'_>]) -> Result<()> {
        scan::exec_all(self.conn()?, source, raws, Consistency::BestEffort).await
    }

    #[instrument(skip_all, fields(source = source, statements = raws.len()))]
    async fn exec_raws_consistent(&mut self, source: &str, raws: &[ExecRaw<'_>]) -> Result<()> {
        scan::exec_all(self.conn()?, source, raws, Consistency::RowsAffected).await
    }
}
