//! Direct execution client
//!
//! Queries check a connection out of the pool for the duration of one call.
//! Exec batches run inside an implicit transaction: commit when every
//! statement succeeds, roll back on the first failure. No partial commit.

use async_trait::async_trait;
use sqlx::AnyPool;
use tracing::{instrument, warn};

use crate::entity::{short_type_name, Consistency, Entity, ExecRaw};
use crate::{scan, Database, Result};

/// Pool-backed handle. Cheap to clone; safe to share between tasks.
#[derive(Debug, Clone)]
pub struct Client {
    pool: AnyPool,
}

impl Client {
    pub(crate) fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn exec_in_tx(
        &self,
        source: &str,
        raws: &[ExecRaw<'_>],
        consistency: Consistency,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        match scan::exec_all(&mut tx, source, raws, consistency).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(source, error = %rollback_err, "rollback failed after batch error");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Database for Client {
    #[instrument(skip_all, fields(entity = short_type_name::<E>(), op = ?op))]
    async fn query_raw<E: Entity>(&mut self, entity: &mut E, op: E::Op) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        scan::fetch_one(&mut conn, entity, op).await
    }

    #[instrument(skip_all, fields(entity = short_type_name::<E>(), op = ?op))]
    async fn query_multi_raw<E: Entity>(&mut self, entity: E, op: E::Op) -> Result<Vec<E>> {
        let mut conn = self.pool.acquire().await?;
        scan::fetch_all(&mut conn, entity, op).await
    }

    #[instrument(skip_all, fields(source = source, statements = raws.len()))]
    async fn exec_raws(&mut self, source: &str, raws: &[ExecRaw<'_>]) -> Result<()> {
        self.exec_in_tx(source, raws, Consistency::BestEffort).await
    }

    #[instrument(skip_all, fields(source = source, statements = raws.len()))]
    async fn exec_raws_consistent(&mut self, source: &str, raws: &[ExecRaw<'_>]) -> Result<()> {
        self.exec_in_tx(source, raws, Consistency::RowsAffected).await
    }
}
