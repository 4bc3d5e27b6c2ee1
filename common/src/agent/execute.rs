use crate::agent::parser::strip_fence_markers;
use crate::agent::state::SessionState;
use crate::executor::{error_row, is_error_result, QueryExecutor, Row};
use std::time::Duration;

pub const EMPTY_SQL_ERROR: &str = "no SQL statement was generated";

/// run the session's current sql; faults come back as an error record
#[tracing::instrument(skip_all, fields(attempt = state.attempts() + 1))]
pub async fn execute_sql(
    executor: &dyn QueryExecutor,
    state: &SessionState,
    timeout: Option<Duration>,
) -> Vec<Row> {
    let sql = strip_fence_markers(state.current_sql());

    if sql.is_empty() {
        tracing::warn!("nothing to execute");
        return vec![error_row(EMPTY_SQL_ERROR)];
    }

    let rows = match timeout {
        Some(limit) => match tokio::time::timeout(limit, executor.execute(&sql)).await {
            Ok(rows) => rows,
            Err(_) => {
                tracing::warn!(timeout_secs = limit.as_secs_f64(), "query timed out");
                vec![error_row(format!("query timed out after {:?}", limit))]
            }
        },
        None => executor.execute(&sql).await,
    };

    if is_error_result(&rows) {
        tracing::warn!(error = ?rows[0].get("error"), "execution returned an error record");
    } else {
        tracing::info!(row_count = rows.len(), "sql executed");
    }

    rows
}
