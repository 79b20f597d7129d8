use crate::history::HistoryEntry;
use std::future::Future;
use std::pin::Pin;

/// Sampling options forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f64,
}

/// Model-inference collaborator.
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    /// One non-streaming chat completion over the full ordered history.
    fn chat<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [HistoryEntry],
        options: &'a ChatOptions,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}
