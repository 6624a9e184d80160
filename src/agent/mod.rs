//! Agent module - hosted LLM client, streaming, and conversation state

pub mod client;
pub mod conversation;
pub mod sse;
pub mod types;

pub use client::OpenAiClient;
pub use conversation::Conversation;
pub use types::{GenerationOptions, Message, Role};
