use crate::agent::parser::{parse_verdict, Parsed, Verdict};
use crate::agent::prompt::build_validation_prompt;
use crate::agent::state::SessionState;
use crate::llm::{complete, TextGenerator};
use std::time::Duration;

/// ask the generator whether the current sql and its result answer the
/// question. an unreadable response is a rejection that asks for new sql.
#[tracing::instrument(skip_all, fields(attempt = state.attempts() + 1))]
pub async fn validate_result(
    generator: &dyn TextGenerator,
    state: &SessionState,
    timeout: Option<Duration>,
) -> Verdict {
    let prompt = build_validation_prompt(
        state.question(),
        state.current_sql(),
        state.result(),
        state.catalog(),
    );

    let response = complete(generator, &prompt, timeout).await;
    tracing::debug!(response = %response, "validator raw response");

    match parse_verdict(&response) {
        Parsed::Ok(verdict) => {
            tracing::info!(
                valid = verdict.valid,
                issue_count = verdict.issues.len(),
                regenerate = verdict.regenerate,
                "validator verdict"
            );
            verdict
        }
        Parsed::Failed { raw, reason } => {
            tracing::warn!(reason = %reason, raw = %raw, "validator response unreadable");
            Verdict::unreadable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{row, ScriptedGenerator};
    use crate::catalog::Catalog;
    use crate::executor::error_row;
    use serde_json::json;
    use std::sync::Arc;

    fn executed_state() -> SessionState {
        SessionState::new("What is the stock of CH-001?", Arc::new(Catalog::builtin().unwrap()))
            .with_sql("SELECT stock FROM master_product WHERE product_id LIKE '%CH-001%'")
            .with_result(vec![row(&[("stock", json!(4500))])])
    }

    #[tokio::test]
    async fn test_validate_approves() {
        let generator = ScriptedGenerator::new([
            "```json\n{\"valid\": true, \"issues\": [], \"regenerate_sql\": false}\n```",
        ]);

        let verdict = validate_result(&generator, &executed_state(), None).await;
        assert_eq!(
            verdict,
            Verdict {
                valid: true,
                issues: vec![],
                regenerate: false
            }
        );
    }

    #[tokio::test]
    async fn test_validate_malformed_response_is_forced_rejection() {
        let generator = ScriptedGenerator::new(["The query looks fine to me!"]);
        let verdict = validate_result(&generator, &executed_state(), None).await;

        assert!(!verdict.valid);
        assert_eq!(verdict.issues, vec!["Validator returned invalid JSON.".to_string()]);
        assert!(verdict.regenerate);
    }

    #[tokio::test]
    async fn test_validate_generator_failure_is_forced_rejection() {
        let generator = ScriptedGenerator::failing();
        let verdict = validate_result(&generator, &executed_state(), None).await;
        assert_eq!(verdict, Verdict::unreadable());
    }

    #[tokio::test]
    async fn test_validate_missing_fields_do_not_approve() {
        let generator = ScriptedGenerator::new(["{\"issues\": [\"unsure\"]}"]);
        let verdict = validate_result(&generator, &executed_state(), None).await;

        assert!(!verdict.valid);
        assert!(!verdict.regenerate);
        assert_eq!(verdict.issues, vec!["unsure".to_string()]);
    }

    #[tokio::test]
    async fn test_validate_prompt_shows_error_record() {
        let generator = ScriptedGenerator::new(["{\"valid\": false}"]);
        let state = executed_state().with_result(vec![error_row("Unknown column 'qty'")]);

        validate_result(&generator, &state, None).await;

        assert!(generator.prompts()[0].contains("Unknown column 'qty'"));
    }
}
