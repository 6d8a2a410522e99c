use crate::error::LmError;
use crate::types::{GenerateRequest, GenerateResponse, GenerationConfig};
use crate::Result;
use reqwest::blocking::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Blocking completion client.
pub struct LmClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    config: GenerationConfig,
}

impl LmClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            config: GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: None,
            },
        }
    }

    /// Read the key from `key_env`; endpoint and model fall back to the
    /// public defaults.
    pub fn from_env(key_env: &str, base_url: Option<&str>, model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var(key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LmError::MissingKey(key_env.to_string()))?;
        Ok(Self::new(
            base_url.unwrap_or(DEFAULT_BASE_URL),
            model.unwrap_or(DEFAULT_MODEL),
            api_key,
        ))
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send `prompt` as one user turn and return the generated text.
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest::prompt(prompt).with_config(self.config.clone());
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(LmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let text = parsed.text().ok_or(LmError::Empty)?;
        tracing::debug!(model = %self.model, len = text.len(), "completion received");
        Ok(text)
    }
}
