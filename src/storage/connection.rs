//! Engine-neutral connection surface
//!
//! Row writers, the gateway and the pool only talk to [`SqlConnection`].
//! Statements use `?` bind markers; each engine adapts them.

use std::fmt;

use serde::Serialize;

use super::dialect::Dialect;
use crate::Result;

/// A bind parameter. Nulls stay typed so server engines can infer the
/// parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param<'a> {
    Int(Option<i64>),
    Text(Option<&'a str>),
}

impl From<i64> for Param<'_> {
    fn from(value: i64) -> Self {
        Param::Int(Some(value))
    }
}

impl From<Option<i64>> for Param<'_> {
    fn from(value: Option<i64>) -> Self {
        Param::Int(value)
    }
}

impl<'a> From<&'a str> for Param<'a> {
    fn from(value: &'a str) -> Self {
        Param::Text(Some(value))
    }
}

impl<'a> From<&'a String> for Param<'a> {
    fn from(value: &'a String) -> Self {
        Param::Text(Some(value.as_str()))
    }
}

impl<'a> From<&'a Option<String>> for Param<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Param::Text(value.as_deref())
    }
}

/// One open connection to a store
pub trait SqlConnection: Send {
    fn dialect(&self) -> Dialect;

    /// Cheap liveness check
    fn ping(&mut self) -> Result<()>;

    /// Run statements that take no parameters and return no rows
    fn execute_batch(&mut self, sql: &str) -> Result<()>;

    /// Run one statement, returning the number of affected rows
    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64>;

    /// First column of the first row, if there is a row
    fn query_i64(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Option<i64>>;

    /// Run literal SQL and return every row
    fn query_rows(&mut self, sql: &str) -> Result<QueryRows>;
}

/// A dynamically typed result cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(t) => write!(f, "{}", t),
            SqlValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Result of a raw query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
