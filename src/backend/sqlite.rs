//! [`SqlConnection`] for `rusqlite`.
//!
//! Only trivial generated SQL runs here: single-table selects, counts and
//! existence checks. SQLite has no `LATERAL` joins, no PostgreSQL `::` casts
//! on JSON operators and no PostGIS, so expansions, observation results and
//! spatial functions need PostgreSQL. This adapter backs tests and local
//! checks and is not a production backend.

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use super::{RowSet, SqlConnection};
use crate::error::BackendError;
use crate::model::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::String(s) => ToSqlOutput::from(s.as_str()),
            Value::Bytes(b) => ToSqlOutput::from(b.as_slice()),
            Value::Json(json) => ToSqlOutput::from(json.to_string()),
        })
    }
}

fn cell(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

impl SqlConnection for Connection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<RowSet, BackendError> {
        let mut stmt = self.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell(row.get_ref(i)?));
            }
            out.push(cells);
        }
        Ok(RowSet { columns, rows: out })
    }
}
