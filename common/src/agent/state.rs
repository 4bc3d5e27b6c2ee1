use crate::agent::parser::Verdict;
use crate::catalog::Catalog;
use crate::executor::Row;
use serde::Serialize;
use std::sync::Arc;

/// validation rounds allowed per question
pub const MAX_ATTEMPTS: u32 = 5;

/// per-question record threaded through the generate/execute/validate loop
///
/// steps read it by reference; it only moves forward through the consuming
/// `with_*` transitions, each returning the next state.
#[derive(Debug, Clone)]
pub struct SessionState {
    question: String,
    catalog: Arc<Catalog>,
    current_sql: String,
    previous_sql: String,
    result: Vec<Row>,
    attempts: u32,
    valid: bool,
    issues: Vec<String>,
    regenerate: bool,
}

impl SessionState {
    pub fn new(question: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        Self {
            question: question.into(),
            catalog,
            current_sql: String::new(),
            previous_sql: String::new(),
            result: Vec::new(),
            attempts: 0,
            valid: false,
            issues: Vec::new(),
            regenerate: false,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_sql(&self) -> &str {
        &self.current_sql
    }

    pub fn previous_sql(&self) -> &str {
        &self.previous_sql
    }

    pub fn result(&self) -> &[Row] {
        &self.result
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn regenerate(&self) -> bool {
        self.regenerate
    }

    pub fn budget_exhausted(&self) -> bool {
        self.attempts >= MAX_ATTEMPTS
    }

    /// record freshly generated sql
    pub fn with_sql(self, sql: impl Into<String>) -> Self {
        Self {
            current_sql: sql.into(),
            ..self
        }
    }

    /// record the rows (or error record) returned for `current_sql`
    pub fn with_result(self, result: Vec<Row>) -> Self {
        Self { result, ..self }
    }

    /// close a cycle: apply the verdict, count the attempt and remember the
    /// validated sql as context for the next generation
    pub fn with_verdict(self, verdict: Verdict) -> Self {
        Self {
            previous_sql: self.current_sql.clone(),
            attempts: self.attempts + 1,
            valid: verdict.valid,
            issues: verdict.issues,
            regenerate: verdict.regenerate,
            ..self
        }
    }

    pub fn into_report(self) -> FinalReport {
        FinalReport {
            sql_query: self.current_sql,
            sql_result: self.result,
            valid: self.valid,
            issues: self.issues,
            attempts: self.attempts,
        }
    }
}

/// what a caller gets back once the loop is done
///
/// `valid == false` means the attempt budget ran out and the last attempt is
/// surfaced as a best effort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReport {
    pub sql_query: String,
    pub sql_result: Vec<Row>,
    pub valid: bool,
    pub issues: Vec<String>,
    pub attempts: u32,
}

impl FinalReport {
    /// stand-in for a session that never reached a verdict; `attempts` is 0
    pub fn aborted(issue: impl Into<String>) -> Self {
        Self {
            sql_query: String::new(),
            sql_result: Vec::new(),
            valid: false,
            issues: vec![issue.into()],
            attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::error_row;

    fn fresh() -> SessionState {
        SessionState::new("What is the stock of CH-001?", Arc::new(Catalog::builtin().unwrap()))
    }

    #[test]
    fn test_new_state_defaults() {
        let state = fresh();
        assert_eq!(state.attempts(), 0);
        assert!(!state.valid());
        assert!(state.issues().is_empty());
        assert!(state.previous_sql().is_empty());
        assert!(state.current_sql().is_empty());
    }

    #[test]
    fn test_with_verdict_counts_and_snapshots() {
        let state = fresh()
            .with_sql("SELECT qty FROM master_product")
            .with_result(vec![error_row("Unknown column 'qty'")])
            .with_verdict(Verdict {
                valid: false,
                issues: vec!["column not found".to_string()],
                regenerate: true,
            });

        assert_eq!(state.attempts(), 1);
        assert_eq!(state.previous_sql(), "SELECT qty FROM master_product");
        assert_eq!(state.issues(), ["column not found".to_string()]);
        assert!(state.regenerate());
    }

    #[test]
    fn test_previous_sql_tracks_the_preceding_cycle() {
        let state = fresh()
            .with_sql("SELECT 1")
            .with_verdict(Verdict::default())
            .with_sql("SELECT 2");

        assert_eq!(state.previous_sql(), "SELECT 1");

        let state = state.with_verdict(Verdict::default());
        assert_eq!(state.previous_sql(), "SELECT 2");
        assert_eq!(state.attempts(), 2);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut state = fresh();
        for _ in 0..MAX_ATTEMPTS {
            assert!(!state.budget_exhausted());
            state = state.with_sql("SELECT 1").with_verdict(Verdict::default());
        }
        assert!(state.budget_exhausted());
    }

    #[test]
    fn test_report_serializes_expected_fields() {
        let report = fresh().with_sql("SELECT 1").into_report();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["sql_query"], "SELECT 1");
        assert!(value["sql_result"].as_array().unwrap().is_empty());
        assert_eq!(value["valid"], false);
        assert!(value["issues"].as_array().unwrap().is_empty());
    }
}
