use super::traits::{ChatBackend, ChatOptions};
use crate::history::HistoryEntry;
use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub struct OllamaBackend {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [HistoryEntry],
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaBackend {
    /// The overall deadline is enforced by the invoker; the client only
    /// bounds connection setup.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call_api(
        &self,
        model: &str,
        messages: &[HistoryEntry],
        options: &ChatOptions,
    ) -> anyhow::Result<String> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options: Options {
                temperature: options.temperature,
            },
        };
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("send Ollama chat request to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
            anyhow::bail!("Ollama API error ({status}): {body}");
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("parse Ollama chat response JSON")?;
        Ok(chat_response.message.content)
    }
}

impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn chat<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [HistoryEntry],
        options: &'a ChatOptions,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.call_api(model, messages, options))
    }
}
