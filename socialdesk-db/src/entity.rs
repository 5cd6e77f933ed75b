//! Entity contract
//!
//! An entity owns its SQL. The engine never knows a table or column name: it
//! hands the entity an operation, runs whatever statement comes back, and
//! gives result rows back to the entity to absorb.

use std::fmt;

use sqlx::any::AnyRow;

use crate::value::Statement;
use crate::{Database, Result};

/// A data type the engine can execute.
///
/// `Op` is the entity's own operation enum. Shapes an entity does not support
/// for an op keep the default body and return `None`, which the engine treats
/// as "nothing to execute".
///
/// ```ignore
/// enum UserOp { ById, All, Create }
///
/// impl Entity for User {
///     type Op = UserOp;
///
///     fn select(&self, op: UserOp) -> Option<Statement> {
///         match op {
///             UserOp::ById => Some(Statement::new("SELECT id, email FROM users WHERE id = $1").bind(self.id)),
///             UserOp::All | UserOp::Create => None,
///         }
///     }
///     // ...
/// }
/// ```
pub trait Entity: Send + Sync + Sized {
    type Op: Copy + fmt::Debug + Send + Sync + 'static;

    /// Single-row query and its parameters.
    fn select(&self, _op: Self::Op) -> Option<Statement> {
        None
    }

    /// Multi-row query and its parameters.
    fn select_many(&self, _op: Self::Op) -> Option<Statement> {
        None
    }

    /// Write statement and its parameters; `source` is the batch's audit tag.
    fn exec(&self, _op: Self::Op, _source: &str) -> Option<Statement> {
        None
    }

    /// A new instance sharing no state with `self`, used for the second and
    /// later rows of a multi-row result.
    fn fresh(&self) -> Self;

    /// Absorb one result row into `self`.
    fn bind_row(&mut self, op: Self::Op, row: &AnyRow) -> std::result::Result<(), sqlx::Error>;
}

type Stage<'a> = dyn Fn(&str) -> Option<Statement> + Send + Sync + 'a;

/// One (entity, op) pair of an exec batch.
pub struct ExecRaw<'a> {
    stage: Box<Stage<'a>>,
    label: String,
}

impl<'a> ExecRaw<'a> {
    pub fn new<E: Entity>(entity: &'a E, op: E::Op) -> Self {
        Self {
            stage: Box::new(move |source: &str| entity.exec(op, source)),
            label: format!("{}::{:?}", short_type_name::<E>(), op),
        }
    }

    /// Statement for this pair under the given source tag.
    pub fn statement(&self, source: &str) -> Option<Statement> {
        (self.stage)(source)
    }

    /// `Type::Op` label used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for ExecRaw<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExecRaw").field(&self.label).finish()
    }
}

/// How an exec batch judges success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Every statement must run without a driver error.
    #[default]
    BestEffort,
    /// Additionally, every statement must change at least one row.
    RowsAffected,
}

/// An ordered set of writes that succeed or fail together.
///
/// ```ignore
/// Batch::new("signup")
///     .push(&team, TeamOp::Create)
///     .push(&user, UserOp::Create)
///     .consistent()
///     .run(&mut db.get())
///     .await?;
/// ```
#[derive(Debug)]
pub struct Batch<'a> {
    source: String,
    raws: Vec<ExecRaw<'a>>,
    consistency: Consistency,
}

impl<'a> Batch<'a> {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            raws: Vec::new(),
            consistency: Consistency::BestEffort,
        }
    }

    pub fn push<E: Entity>(mut self, entity: &'a E, op: E::Op) -> Self {
        self.raws.push(ExecRaw::new(entity, op));
        self
    }

    /// Treat a statement that changes no rows as a failure.
    pub fn consistent(mut self) -> Self {
        self.consistency = Consistency::RowsAffected;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    pub fn len(&self) -> usize {
        self.raws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raws.is_empty()
    }

    /// Execute on any handle: implicit transaction for a `Client`, the
    /// caller's transaction for a `Tx`.
    pub async fn run<D: Database>(self, db: &mut D) -> Result<()> {
        match self.consistency {
            Consistency::BestEffort => db.exec_raws(&self.source, &self.raws).await,
            Consistency::RowsAffected => db.exec_raws_consistent(&self.source, &self.raws).await,
        }
    }
}

/// Type name without its module path. Generic arguments are kept as-is.
pub(crate) fn short_type_name<T>() -> &'static str {
    trim_path(std::any::type_name::<T>())
}

fn trim_path(full: &str) -> &str {
    let path_end = full.find('<').unwrap_or(full.len());
    let start = full[..path_end].rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}
