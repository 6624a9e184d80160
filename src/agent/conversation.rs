//! Conversation management

use crate::agent::types::{Message, Role};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An in-memory conversation transcript
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: Uuid,
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// System prompt for this conversation
    pub system_prompt: Option<String>,
    /// When the conversation started
    pub created_at: DateTime<Utc>,
    /// When the conversation was last updated
    pub updated_at: DateTime<Utc>,
    /// Model being used
    pub model: String,
}

impl Conversation {
    /// Create a new conversation
    pub fn new(model: impl Into<String>) -> Self {
        let now = Utc::now();
        Conversation {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            system_prompt: None,
            created_at: now,
            updated_at: now,
            model: model.into(),
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Replace the system prompt (used to inject recalled memories per turn)
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    /// Add a message to the conversation
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Add a user message
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    /// Get messages formatted for API request (includes system prompt)
    pub fn get_api_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);

        if let Some(ref system) = self.system_prompt {
            messages.push(Message::system(system));
        }

        messages.extend(self.messages.clone());
        messages
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.messages.clear();
        self.updated_at = Utc::now();
    }

    /// Get message count
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Check if conversation is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the last assistant message, if any
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_creation() {
        let conv = Conversation::new("gpt-4o");
        assert_eq!(conv.model, "gpt-4o");
        assert!(conv.is_empty());
    }

    #[test]
    fn test_add_messages() {
        let mut conv = Conversation::new("gpt-4o");
        conv.add_user_message("Hello");
        conv.add_assistant_message("Hi there!");

        assert_eq!(conv.message_count(), 2);
        assert_eq!(conv.messages[0].role, Role::User);
        assert_eq!(conv.messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_api_messages_with_system() {
        let conv = Conversation::new("gpt-4o").with_system_prompt("You are a helpful assistant.");

        let api_messages = conv.get_api_messages();
        assert_eq!(api_messages.len(), 1);
        assert_eq!(api_messages[0].role, Role::System);
    }

    // The transcript contract from the chat loop: after streaming, the
    // stored assistant entry is exactly the accumulated delta text.
    #[test]
    fn test_streamed_text_becomes_final_transcript_entry() {
        let mut conv = Conversation::new("gpt-4o");
        conv.add_user_message("question");

        let deltas = ["The ", "answer ", "is ", "42."];
        let mut streamed = String::new();
        for d in deltas {
            streamed.push_str(d);
        }
        conv.add_assistant_message(&streamed);

        assert_eq!(
            conv.last_assistant_message().unwrap().content,
            "The answer is 42."
        );
    }
}
