use crate::agent::execute::execute_sql;
use crate::agent::generate::generate_sql;
use crate::agent::state::{FinalReport, SessionState, MAX_ATTEMPTS};
use crate::agent::validate::validate_result;
use crate::catalog::Catalog;
use crate::executor::QueryExecutor;
use crate::llm::TextGenerator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::Instrument;

pub const SESSION_ABORTED_ISSUE: &str = "session aborted before producing a report";

#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    /// upper bound on each generator and executor call; `None` blocks until
    /// the collaborator answers
    pub call_timeout: Option<Duration>,
}

/// where the loop is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Generate,
    Execute,
    Validate,
    Retry,
    Done,
}

/// transition taken after every validation
pub fn route_after_validation(state: &SessionState) -> Phase {
    if state.valid() || state.budget_exhausted() {
        return Phase::Done;
    }
    Phase::Retry
}

/// sequences generation, execution and validation until the validator
/// approves or the attempt budget runs out
#[derive(Clone)]
pub struct LoopController {
    generator: Arc<dyn TextGenerator>,
    executor: Arc<dyn QueryExecutor>,
    catalog: Arc<Catalog>,
    config: LoopConfig,
}

impl LoopController {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
        catalog: Arc<Catalog>,
        config: LoopConfig,
    ) -> Self {
        Self {
            generator,
            executor,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub async fn run(&self, question: &str) -> FinalReport {
        let state = SessionState::new(question, Arc::clone(&self.catalog));
        self.drive(state).await.into_report()
    }

    /// run a prepared session to completion
    #[tracing::instrument(skip_all, fields(question = %state.question()))]
    pub async fn drive(&self, mut state: SessionState) -> SessionState {
        let timeout = self.config.call_timeout;
        let mut phase = Phase::Generate;

        loop {
            phase = match phase {
                Phase::Generate => {
                    let sql = generate_sql(self.generator.as_ref(), &state, timeout).await;
                    state = state.with_sql(sql);
                    Phase::Execute
                }
                Phase::Execute => {
                    let rows = execute_sql(self.executor.as_ref(), &state, timeout).await;
                    state = state.with_result(rows);
                    Phase::Validate
                }
                Phase::Validate => {
                    let verdict = validate_result(self.generator.as_ref(), &state, timeout).await;
                    state = state.with_verdict(verdict);
                    route_after_validation(&state)
                }
                Phase::Retry => {
                    tracing::info!(
                        "attempt {}/{} rejected, regenerating",
                        state.attempts(),
                        MAX_ATTEMPTS
                    );
                    Phase::Generate
                }
                Phase::Done => break,
            };
        }

        if state.valid() {
            tracing::info!(attempts = state.attempts(), "query validated");
        } else {
            tracing::warn!(
                attempts = state.attempts(),
                issues = ?state.issues(),
                "attempt budget exhausted, returning best effort"
            );
        }

        state
    }

    /// answer independent questions concurrently; reports keep question order
    ///
    /// a session whose task dies (panic or cancellation) gets an aborted
    /// report in its slot; the other sessions still finish.
    pub async fn answer_all(&self, questions: Vec<String>) -> Vec<FinalReport> {
        let total = questions.len();
        let mut join_set = JoinSet::new();

        for (index, question) in questions.into_iter().enumerate() {
            let controller = self.clone();
            let span = tracing::info_span!("session", session.index = index);

            join_set.spawn(
                async move {
                    let report = controller.run(&question).await;
                    (index, report)
                }
                .instrument(span),
            );
        }

        let mut reports: Vec<Option<FinalReport>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => tracing::error!(error = %e, "session task failed"),
            }
        }

        reports
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| FinalReport::aborted(SESSION_ABORTED_ISSUE)))
            .collect()
    }
}
