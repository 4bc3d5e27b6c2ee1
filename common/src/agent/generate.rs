use crate::agent::parser::{parse_sql, Parsed};
use crate::agent::prompt::build_generation_prompt;
use crate::agent::state::SessionState;
use crate::llm::{complete, TextGenerator};
use std::time::Duration;

/// ask the generator for sql answering the session's question, repairing
/// the previous attempt when there is one
#[tracing::instrument(skip_all, fields(attempt = state.attempts() + 1))]
pub async fn generate_sql(
    generator: &dyn TextGenerator,
    state: &SessionState,
    timeout: Option<Duration>,
) -> String {
    let prompt = build_generation_prompt(
        state.question(),
        state.catalog(),
        state.previous_sql(),
        state.issues(),
    );

    let output = complete(generator, &prompt, timeout).await;

    match parse_sql(&output) {
        Parsed::Ok(sql) => {
            tracing::info!(sql = %sql, "sql generated");
            sql
        }
        Parsed::Failed { raw, reason } => {
            // left for execution to reject
            tracing::warn!(reason = %reason, raw_len = raw.len(), "no sql in generator output");
            String::new()
        }
    }
}
