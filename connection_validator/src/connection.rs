//! Connection, statement and cursor capabilities
//!
//! These traits describe the minimum a database session has to offer for a
//! probe query to run against it: a query-execution context borrowed from the
//! connection, and a forward-only cursor over the returned rows. Both resources
//! have an explicit asynchronous `close`, because releasing them may itself
//! talk to the server and fail.

use async_trait::async_trait;

use crate::errors::ConnectionError;

/// A single column value as seen by a probe
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ProbeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ProbeValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ProbeValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for ProbeValue {
    fn from(val: i64) -> Self {
        ProbeValue::Int(val)
    }
}

impl From<i32> for ProbeValue {
    fn from(val: i32) -> Self {
        ProbeValue::Int(i64::from(val))
    }
}

impl From<bool> for ProbeValue {
    fn from(val: bool) -> Self {
        ProbeValue::Bool(val)
    }
}

impl From<f64> for ProbeValue {
    fn from(val: f64) -> Self {
        ProbeValue::Float(val)
    }
}

impl From<&str> for ProbeValue {
    fn from(val: &str) -> Self {
        ProbeValue::Text(val.to_string())
    }
}

impl From<String> for ProbeValue {
    fn from(val: String) -> Self {
        ProbeValue::Text(val)
    }
}

impl<T> From<Option<T>> for ProbeValue
where
    T: Into<ProbeValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => ProbeValue::Null,
        }
    }
}

/// One row returned by a probe query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeRow {
    values: Vec<ProbeValue>,
}

impl ProbeRow {
    pub fn new(values: Vec<ProbeValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&ProbeValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[ProbeValue] {
        &self.values
    }
}

impl From<Vec<ProbeValue>> for ProbeRow {
    fn from(values: Vec<ProbeValue>) -> Self {
        Self::new(values)
    }
}

/// Forward-only cursor over the rows produced by a query
#[async_trait]
pub trait ResultCursor: Send {
    /// Advance the cursor, returning `None` once the rows are exhausted
    async fn next_row(&mut self) -> Result<Option<ProbeRow>, ConnectionError>;

    /// Release the cursor. Called at most once by the validator.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Query-execution context created from a [`Connection`]
#[async_trait]
pub trait Statement: Send {
    type Cursor: ResultCursor + 'static;

    async fn execute_query(&mut self, sql: &str) -> Result<Self::Cursor, ConnectionError>;

    /// Release the execution context. Called at most once by the validator.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Stateful handle to a database session
///
/// Validation takes the connection by `&mut`, so nothing else can use it
/// while a probe is in flight.
#[async_trait]
pub trait Connection: Send {
    type Statement<'c>: Statement + 'c
    where
        Self: 'c;

    async fn create_statement<'c>(&'c mut self) -> Result<Self::Statement<'c>, ConnectionError>;
}

/// Cursor over rows that were fully fetched up front
#[derive(Debug, Default)]
pub struct RowCursor {
    rows: std::vec::IntoIter<ProbeRow>,
    closed: bool,
}

impl RowCursor {
    pub fn new(rows: Vec<ProbeRow>) -> Self {
        Self {
            rows: rows.into_iter(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl ResultCursor for RowCursor {
    async fn next_row(&mut self) -> Result<Option<ProbeRow>, ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed("result cursor".to_string()));
        }
        Ok(self.rows.next())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.closed = true;
        // Drop remaining buffered rows
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}
