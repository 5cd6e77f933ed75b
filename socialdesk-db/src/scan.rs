//! Statement execution shared by the direct and transactional clients.
//!
//! Everything here runs on one borrowed connection: a pooled connection for
//! the direct client, the transaction's connection for `Tx`.

use futures::TryStreamExt;
use sqlx::AnyConnection;
use tracing::{debug, warn};

use crate::entity::{short_type_name, Consistency, Entity, ExecRaw};
use crate::value::non_empty;
use crate::{DbError, Result};

/// Run the entity's single-row query and bind the first row into it.
pub(crate) async fn fetch_one<E: Entity>(
    conn: &mut AnyConnection,
    entity: &mut E,
    op: E::Op,
) -> Result<()> {
    let Some(stmt) = non_empty(entity.select(op)) else {
        debug!(entity = short_type_name::<E>(), ?op, "no single-row query for op");
        return Err(DbError::NoRecords);
    };

    let row = stmt
        .query()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::NoRecords)?;

    entity.bind_row(op, &row)?;
    Ok(())
}

/// Run the entity's multi-row query, one entity per row in database order.
///
/// The first row lands in `entity`; later rows land in `entity.fresh()`
/// instances, so no two results share state.
pub(crate) async fn fetch_all<E: Entity>(
    conn: &mut AnyConnection,
    entity: E,
    op: E::Op,
) -> Result<Vec<E>> {
    let Some(stmt) = non_empty(entity.select_many(op)) else {
        debug!(entity = short_type_name::<E>(), ?op, "no multi-row query for op");
        return Err(DbError::NoRecords);
    };

    let mut rows = stmt.query().fetch(&mut *conn);
    let Some(row) = rows.try_next().await? else {
        return Err(DbError::NoRecords);
    };

    let mut items = vec![entity];
    items[0].bind_row(op, &row)?;

    while let Some(row) = rows.try_next().await? {
        let mut item = items[0].fresh();
        item.bind_row(op, &row)?;
        items.push(item);
    }

    Ok(items)
}

/// Execute every pair in order on `conn`, stopping at the first failure.
///
/// Does not begin, commit or roll back; callers own the transaction.
pub(crate) async fn exec_all(
    conn: &mut AnyConnection,
    source: &str,
    raws: &[ExecRaw<'_>],
    consistency: Consistency,
) -> Result<()> {
    for (index, raw) in raws.iter().enumerate() {
        let Some(stmt) = non_empty(raw.statement(source)) else {
            debug!(source, index, raw = raw.label(), "no exec statement for op, skipping");
            continue;
        };

        let result = stmt.query().execute(&mut *conn).await?;
        let affected = result.rows_affected();
        debug!(source, index, raw = raw.label(), affected, "executed statement");

        if consistency == Consistency::RowsAffected && affected == 0 {
            warn!(source, index, raw = raw.label(), "statement affected no rows, aborting batch");
            return Err(DbError::NoRowsAffected);
        }
    }
    Ok(())
}
