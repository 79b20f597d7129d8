use super::traits::{ChatBackend, ChatOptions};
use crate::config::ModelConfig;
use crate::error::InferenceError;
use crate::history::HistoryEntry;
use std::sync::Arc;
use std::time::Duration;

/// Single-attempt, deadline-bound model call.
#[derive(Clone)]
pub struct InferenceInvoker {
    backend: Arc<dyn ChatBackend>,
    model: String,
    options: ChatOptions,
    timeout: Duration,
}

impl InferenceInvoker {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: String,
        options: ChatOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            model,
            options,
            timeout,
        }
    }

    pub fn from_config(backend: Arc<dyn ChatBackend>, config: &ModelConfig) -> Self {
        Self::new(
            backend,
            config.name.clone(),
            ChatOptions {
                temperature: config.temperature,
            },
            config.timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn invoke(&self, history: &[HistoryEntry]) -> Result<String, InferenceError> {
        let call = self.backend.chat(&self.model, history, &self.options);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(error)) => {
                let message = format!("{error:#}");
                tracing::error!(
                    backend = self.backend.name(),
                    model = %self.model,
                    error = %message,
                    "inference failed"
                );
                Err(InferenceError::Backend(message))
            }
            Err(_) => {
                tracing::error!(
                    backend = self.backend.name(),
                    model = %self.model,
                    timeout_secs = self.timeout.as_secs(),
                    "inference timed out"
                );
                Err(InferenceError::Timeout)
            }
        }
    }
}
