//! Owned SQL parameter values.
//!
//! Lets entity definitions describe their columns as plain data
//! (`Vec<(&'static str, Bind)>`) while the store alone talks to
//! `QueryBuilder`.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// A single value bound into a generated statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
    Null,
}

impl Bind {
    /// Appends this value as a `?` placeholder.
    pub(crate) fn push_to(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Bind::Text(v) => {
                qb.push_bind(v);
            }
            Bind::Int(v) => {
                qb.push_bind(v);
            }
            Bind::Bool(v) => {
                qb.push_bind(v);
            }
            Bind::Time(v) => {
                qb.push_bind(v);
            }
            Bind::Null => {
                qb.push_bind(Option::<String>::None);
            }
        }
    }
}

impl From<String> for Bind {
    fn from(v: String) -> Self {
        Bind::Text(v)
    }
}

impl From<&str> for Bind {
    fn from(v: &str) -> Self {
        Bind::Text(v.to_string())
    }
}

impl From<i64> for Bind {
    fn from(v: i64) -> Self {
        Bind::Int(v)
    }
}

impl From<bool> for Bind {
    fn from(v: bool) -> Self {
        Bind::Bool(v)
    }
}

impl From<DateTime<Utc>> for Bind {
    fn from(v: DateTime<Utc>) -> Self {
        Bind::Time(v)
    }
}

impl<T: Into<Bind>> From<Option<T>> for Bind {
    fn from(v: Option<T>) -> Self {
        v.map_or(Bind::Null, Into::into)
    }
}

/// Text value with surrounding whitespace removed.
pub(crate) fn trimmed(v: &str) -> Bind {
    Bind::Text(v.trim().to_string())
}
