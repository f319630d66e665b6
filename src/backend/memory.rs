//! Scripted connection for exercising the executor without a database.

use std::collections::VecDeque;

use super::{RowSet, SqlConnection};
use crate::error::BackendError;
use crate::model::Value;

/// Returns canned results in call order and records every statement.
#[derive(Debug, Default)]
pub struct FixtureConnection {
    responses: VecDeque<Result<RowSet, String>>,
    executed: Vec<String>,
}

impl FixtureConnection {
    /// Connection with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result.
    pub fn respond(mut self, rows: RowSet) -> Self {
        self.responses.push_back(Ok(rows));
        self
    }

    /// Queues a driver failure.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.responses.push_back(Err(message.into()));
        self
    }

    /// Statements received so far.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl SqlConnection for FixtureConnection {
    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<RowSet, BackendError> {
        self.executed.push(sql.to_owned());
        match self.responses.pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(BackendError::Message(message)),
            None => Err(BackendError::Message(format!(
                "no scripted response for statement #{}",
                self.executed.len()
            ))),
        }
    }
}
