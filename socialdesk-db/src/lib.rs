//! socialdesk-db: raw query and transaction execution engine
//!
//! Entities describe their own SQL per operation; the engine runs it and
//! hands rows back. Two handles implement the same [`Database`] contract:
//!
//! - [`Client`] runs on the pool and wraps each exec batch in its own
//!   transaction.
//! - [`Tx`] runs inside a transaction the caller opened with [`Db::begin`]
//!   and leaves commit/rollback to the caller.
//!
//! ## Architecture
//!
//! ```text
//! Db::init(config) ──► Db ──get()──► Client ─┐
//!                       │                    ├─► Database::{query_raw, query_multi_raw,
//!                       └──begin()─► Tx ─────┘               exec_raws, exec_raws_consistent}
//!                                                      │
//!                                      Entity::{select, select_many, exec, bind_row, fresh}
//! ```

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod pool;
mod scan;
pub mod tx;
pub mod value;

use async_trait::async_trait;

pub use client::Client;
pub use config::{DbConfig, Driver};
pub use entity::{Batch, Consistency, Entity, ExecRaw};
pub use error::{DbError, Result};
pub use pool::{Db, IsolationLevel, PoolStats, TxOptions};
pub use sqlx::any::AnyRow;
pub use sqlx::Row;
pub use tx::Tx;
pub use value::{NullKind, Nullable, Statement, Value};

/// The execution contract shared by [`Client`] and [`Tx`].
///
/// Calling code can be written once against `D: Database` and run either
/// directly on the pool or inside a caller-owned transaction.
#[async_trait]
pub trait Database: Send {
    /// Fetch one row and bind it into `entity`.
    ///
    /// Zero rows yields [`DbError::NoRecords`].
    async fn query_raw<E: Entity>(&mut self, entity: &mut E, op: E::Op) -> Result<()>;

    /// Fetch every row, one entity per row in database order.
    ///
    /// Zero rows yields [`DbError::NoRecords`].
    async fn query_multi_raw<E: Entity>(&mut self, entity: E, op: E::Op) -> Result<Vec<E>>;

    /// Execute the pairs in order; any driver error aborts the batch.
    async fn exec_raws(&mut self, source: &str, raws: &[ExecRaw<'_>]) -> Result<()>;

    /// Like [`Database::exec_raws`], but a statement that changes zero rows
    /// aborts the batch with [`DbError::NoRowsAffected`].
    async fn exec_raws_consistent(&mut self, source: &str, raws: &[ExecRaw<'_>]) -> Result<()>;
}
