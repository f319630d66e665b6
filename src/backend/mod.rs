//! Connection abstraction the executor runs statements through.
//!
//! The engine issues one statement per call and drains it completely, so
//! adapters hand back fully materialized [`RowSet`]s.

mod memory;
mod sqlite;

pub use memory::FixtureConnection;

use crate::error::BackendError;
use crate::model::Value;

/// Fully materialized result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Rows, each as wide as `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Empty result with the given columns.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        RowSet {
            columns: columns.iter().map(|c| c.as_ref().to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of the first row, as returned by scalar statements.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// A database session able to run one statement and return its rows.
pub trait SqlConnection {
    /// Runs `sql` with positional `params` and returns every row.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<RowSet, BackendError>;
}
