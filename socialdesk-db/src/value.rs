//! Positional parameter values and the statements entities produce.

use serde::{Deserialize, Serialize};
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;

/// A positional parameter value.
///
/// Covers the types the `Any` driver can bind on every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A NULL that remembers the column type it stands in for, so strictly
    /// typed backends accept it.
    Null(NullKind),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

/// Declared type of a [`Value::Null`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullKind {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
}

/// Types with a fixed [`NullKind`], used when an `Option` is `None`.
pub trait Nullable {
    const NULL_KIND: NullKind;
}

macro_rules! nullable {
    ($kind:ident: $($ty:ty),+) => {
        $(impl Nullable for $ty {
            const NULL_KIND: NullKind = NullKind::$kind;
        })+
    };
}

nullable!(Integer: i64, i32);
nullable!(Real: f64);
nullable!(Boolean: bool);
nullable!(Text: String, &str, &String);
nullable!(Blob: Vec<u8>);

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value> + Nullable> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null(T::NULL_KIND), Into::into)
    }
}

/// Query text plus its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Blank query text means there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// Build the sqlx query with every parameter bound in order.
    pub(crate) fn query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| match value {
                Value::Null(NullKind::Integer) => query.bind(None::<i64>),
                Value::Null(NullKind::Real) => query.bind(None::<f64>),
                Value::Null(NullKind::Text) => query.bind(None::<String>),
                Value::Null(NullKind::Blob) => query.bind(None::<Vec<u8>>),
                Value::Null(NullKind::Boolean) => query.bind(None::<bool>),
                Value::Integer(v) => query.bind(*v),
                Value::Real(v) => query.bind(*v),
                Value::Text(v) => query.bind(v.clone()),
                Value::Blob(v) => query.bind(v.clone()),
                Value::Boolean(v) => query.bind(*v),
            })
    }
}

/// Drop statements with blank text so callers only see real work.
pub(crate) fn non_empty(statement: Option<Statement>) -> Option<Statement> {
    statement.filter(|s| !s.is_empty())
}
