use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// free-text generation backend
///
/// output is untrusted: it may be wrapped in code fences, carry commentary,
/// be malformed json, or be empty.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// invoke a generator once, turning a failure or an elapsed deadline into
/// empty text so the calling step always gets a string back
#[tracing::instrument(skip(generator, prompt), fields(generator = generator.name(), prompt_len = prompt.len()))]
pub async fn complete(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Option<Duration>,
) -> String {
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, generator.generate(prompt)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(timeout_secs = limit.as_secs_f64(), "generator call timed out");
                return String::new();
            }
        },
        None => generator.generate(prompt).await,
    };

    match outcome {
        Ok(text) => {
            tracing::debug!(output_len = text.len(), "generator returned");
            text
        }
        Err(e) => {
            tracing::warn!(error = %e, "generator call failed, continuing with empty output");
            String::new()
        }
    }
}
