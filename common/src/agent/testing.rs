//! scripted collaborators for exercising the loop without a model or database

use crate::error::{Result, Txt2SqlError};
use crate::executor::{QueryExecutor, Row};
use crate::llm::TextGenerator;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// replays canned responses in order and records every prompt it saw
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(Txt2SqlError::Generator(
                "connection reset".to_string(),
            ))])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// returns canned result sets in order and records the sql it was given
pub struct ScriptedExecutor {
    results: Mutex<VecDeque<Vec<Row>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(results: impl IntoIterator<Item = Vec<Row>>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str) -> Vec<Row> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.results.lock().unwrap().pop_front().unwrap_or_default()
    }
}

pub fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
