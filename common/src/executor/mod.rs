pub mod mysql;

pub use mysql::{DatabaseConfig, MySqlExecutor};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Display;

/// one result row, column name -> scalar, in select order
pub type Row = Map<String, Value>;

pub const ERROR_KEY: &str = "error";

/// runs sql against a relational store
///
/// implementations never fail: any fault (connection, syntax, permission)
/// is returned as a single `{"error": ...}` row. zero matching rows is an
/// empty vec, not an error.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Vec<Row>;
}

pub fn error_row(message: impl Into<String>) -> Row {
    let mut row = Row::new();
    row.insert(ERROR_KEY.to_string(), Value::String(message.into()));
    row
}

/// fold a fallible query outcome into the row-or-error-record shape
pub fn rows_or_error<E: Display>(outcome: std::result::Result<Vec<Row>, E>) -> Vec<Row> {
    match outcome {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "query execution failed");
            vec![error_row(e.to_string())]
        }
    }
}

pub fn is_error_result(rows: &[Row]) -> bool {
    matches!(rows, [row] if row.contains_key(ERROR_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_row_has_single_error_key() {
        let row = error_row("boom");
        assert_eq!(row.len(), 1);
        assert_eq!(row[ERROR_KEY], json!("boom"));
    }

    #[test]
    fn test_rows_or_error_wraps_fault() {
        let rows = rows_or_error::<String>(Err("Unknown column 'qty'".to_string()));
        assert!(is_error_result(&rows));
        assert_eq!(rows[0][ERROR_KEY], json!("Unknown column 'qty'"));
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let rows = rows_or_error::<String>(Ok(vec![]));
        assert!(rows.is_empty());
        assert!(!is_error_result(&rows));
    }

    #[test]
    fn test_data_rows_are_not_errors() {
        let mut row = Row::new();
        row.insert("stock".to_string(), json!(4500));
        assert!(!is_error_result(&[row]));
    }
}
