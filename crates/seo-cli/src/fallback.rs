//! Wires the language-model client into the extractor's fallback seam.

use lm_client::LmClient;
use seo_core::config::FallbackConfig;
use seo_core::extract::CompletionService;

struct LmFallback(LmClient);

impl CompletionService for LmFallback {
    fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.complete(prompt)?)
    }
}

/// The fallback parser, when enabled and its key is present.
pub fn service(config: &FallbackConfig) -> Option<Box<dyn CompletionService>> {
    if !config.enabled {
        return None;
    }
    match LmClient::from_env(
        &config.api_key_env,
        Some(&config.api_base_url),
        Some(&config.model),
    ) {
        Ok(client) => {
            tracing::debug!(model = %client.model(), "fallback parser enabled");
            Some(Box::new(LmFallback(client)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "fallback parser disabled");
            None
        }
    }
}
