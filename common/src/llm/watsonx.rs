use crate::error::{Result, Txt2SqlError};
use crate::llm::generator::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_URL: &str = "https://us-south.ml.cloud.ibm.com";
pub const DEFAULT_MODEL_ID: &str = "mistralai/mistral-medium-2505";
const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";
const API_VERSION: &str = "2023-05-29";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct WatsonxConfig {
    pub api_key: String,
    pub project_id: String,
    pub url: String,
    pub model_id: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    /// per-request http timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl WatsonxConfig {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            url: DEFAULT_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_new_tokens: 3000,
            temperature: 0.0,
            request_timeout: None,
        }
    }

    fn generation_endpoint(&self) -> String {
        format!(
            "{}/ml/v1/text/generation?version={}",
            self.url.trim_end_matches('/'),
            API_VERSION
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model_id: &'a str,
    project_id: &'a str,
    input: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    decoding_method: &'static str,
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    #[serde(default)]
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// ibm watsonx.ai text generation client
#[derive(Debug)]
pub struct WatsonxClient {
    config: WatsonxConfig,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl WatsonxClient {
    pub fn new(config: WatsonxConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Txt2SqlError::Config("watsonx api key is not set".to_string()));
        }
        if config.project_id.is_empty() {
            return Err(Txt2SqlError::Config("watsonx project id is not set".to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        tracing::info!(model = %config.model_id, url = %config.url, "watsonx client configured");

        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    fn parameters(&self) -> GenerationParameters {
        // watsonx rejects a temperature under greedy decoding
        if self.config.temperature <= 0.0 {
            GenerationParameters {
                decoding_method: "greedy",
                max_new_tokens: self.config.max_new_tokens,
                temperature: None,
            }
        } else {
            GenerationParameters {
                decoding_method: "sample",
                max_new_tokens: self.config.max_new_tokens,
                temperature: Some(self.config.temperature),
            }
        }
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("requesting iam access token");
        let response = self
            .client
            .post(IAM_TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Txt2SqlError::Generator(format!(
                "iam token request failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl TextGenerator for WatsonxClient {
    fn name(&self) -> &str {
        &self.config.model_id
    }

    #[tracing::instrument(skip(self, prompt), fields(llm.model = %self.config.model_id, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let token = self.bearer_token().await?;

        let request = GenerationRequest {
            model_id: &self.config.model_id,
            project_id: &self.config.project_id,
            input: prompt,
            parameters: self.parameters(),
        };

        let response = self
            .client
            .post(self.config.generation_endpoint())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Txt2SqlError::Generator(format!(
                "text generation failed ({}): {}",
                status, body
            )));
        }

        let body: GenerationResponse = response.json().await?;
        let text = body
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text)
            .unwrap_or_default();

        tracing::debug!(output_len = text.len(), "watsonx generation complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = WatsonxClient::new(WatsonxConfig::new("", "project")).unwrap_err();
        assert!(matches!(err, Txt2SqlError::Config(_)));
    }

    #[test]
    fn test_missing_project_is_rejected() {
        let err = WatsonxClient::new(WatsonxConfig::new("key", "")).unwrap_err();
        assert!(err.to_string().contains("project id"));
    }

    #[test]
    fn test_generation_endpoint_trims_trailing_slash() {
        let mut config = WatsonxConfig::new("key", "project");
        config.url = "https://eu-de.ml.cloud.ibm.com/".to_string();

        assert_eq!(
            config.generation_endpoint(),
            "https://eu-de.ml.cloud.ibm.com/ml/v1/text/generation?version=2023-05-29"
        );
    }

    #[test]
    fn test_zero_temperature_uses_greedy_decoding() {
        let client = WatsonxClient::new(WatsonxConfig::new("key", "project")).unwrap();
        let params = serde_json::to_value(client.parameters()).unwrap();

        assert_eq!(params["decoding_method"], "greedy");
        assert_eq!(params["max_new_tokens"], 3000);
        assert!(params.get("temperature").is_none());
    }

    #[test]
    fn test_response_parsing_tolerates_missing_results() {
        let body: GenerationResponse = serde_json::from_str(r#"{"model_id": "m"}"#).unwrap();
        assert!(body.results.is_empty());
    }
}
