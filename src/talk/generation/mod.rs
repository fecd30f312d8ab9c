//! Completion backend abstraction and the OpenAI chat client.

pub mod backend;
pub mod chat_client;
pub mod message;

pub use backend::CompletionBackend;
pub use chat_client::OpenAiChatClient;
pub use message::{ChatMessage, ChatRole};
