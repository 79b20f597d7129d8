pub mod invoker;
pub mod ollama;
pub mod traits;

pub use invoker::InferenceInvoker;
pub use ollama::OllamaBackend;
pub use traits::{ChatBackend, ChatOptions};
