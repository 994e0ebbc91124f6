use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{ClaimsError, Result};

/// Sampling temperatures per call-site. Governance checks use the provider default.
pub mod temperature {
    pub const EXPLANATION: f64 = 0.3;
    pub const CLAIM_QA: f64 = 0.3;
    pub const QUOTE_CHAT: f64 = 0.2;
    pub const UNDERWRITING: f64 = 0.0;
}

/// One request to the hosted model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f64>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text completion against a hosted model. One attempt per call, no retries.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// [`LlmClient`] backed by OpenRouter through rig.
pub struct OpenRouterClient {
    client: openrouter::Client,
    model: String,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut builder = self.client.agent(&self.model);
        if let Some(system) = &request.system {
            builder = builder.preamble(system);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(temperature);
        }
        let agent = builder.build();

        debug!(
            model = %self.model,
            temperature = ?request.temperature,
            prompt_length = request.prompt.len(),
            "Sending completion request"
        );

        let prompt = request.prompt;
        let response = tokio::time::timeout(self.timeout, async move { agent.prompt(prompt).await })
            .await
            .map_err(|_| {
                error!(model = %self.model, timeout = ?self.timeout, "Completion timed out");
                ClaimsError::timeout(self.timeout)
            })?
            .map_err(|e| {
                error!(model = %self.model, error = %e, "Completion failed");
                ClaimsError::service(format!("completion failed: {e}"))
            })?;

        Ok(response.trim().to_string())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in order and records every request it receives.
    #[derive(Default)]
    pub struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        pub fn new<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let llm = Self::default();
            for response in responses {
                llm.push(Ok(response.into()));
            }
            llm
        }

        pub fn push(&self, response: Result<String>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClaimsError::service("no scripted response left")))
        }
    }
}
