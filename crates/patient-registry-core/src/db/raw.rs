//! Restricted ad hoc read path for diagnostics and reporting.
//!
//! The keyword filter is defense in depth, not a security boundary: substring
//! matching can be bypassed with comments or encoding tricks, so the store
//! account behind it must not hold write privileges. The substring match also
//! rejects legitimate identifiers that contain a blocked word (for example
//! `created_at` contains `create`); that conservative behavior is intentional.

use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};

/// Keywords that reject a query when present anywhere in its lowercased text.
const BLOCKED_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "truncate", "create", "replace", "grant",
    "revoke", "commit", "rollback",
];

/// Result of a read-only query: column names in engine order plus row values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Reject anything that is not a plain SELECT.
///
/// The text is trimmed and lowercased for inspection only; callers execute
/// the original text unmodified.
fn ensure_read_only(text: &str) -> DbResult<()> {
    let normalized = text.trim().to_lowercase();
    if !normalized.starts_with("select") {
        return Err(DbError::RejectedQuery(
            "only SELECT statements are allowed".into(),
        ));
    }
    for keyword in BLOCKED_KEYWORDS {
        if normalized.contains(keyword) {
            return Err(DbError::RejectedQuery(format!(
                "query contains blocked keyword '{keyword}'"
            )));
        }
    }
    Ok(())
}

impl Database {
    /// Execute an ad hoc query after the read-only gate.
    pub fn execute_read_only(&self, text: &str) -> DbResult<QueryResult> {
        ensure_read_only(text)?;

        let mut stmt = self.conn.prepare(text)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                record.push(value_to_json(row.get_ref(i)?));
            }
            out.push(record);
        }

        Ok(QueryResult {
            columns,
            rows: out,
        })
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(hex::encode(b)),
    }
}
