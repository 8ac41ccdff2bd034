//! Ordered messages handed to the agent.

use crate::types::ModelMessage;

/// An ordered sequence of role-tagged messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation holding one user message.
    pub fn from_user_message(text: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.add_user_message(text);
        conversation
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(ModelMessage::user(text));
    }

    pub fn add_message(&mut self, message: ModelMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ModelMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<ModelMessage>> for Conversation {
    fn from(messages: Vec<ModelMessage>) -> Self {
        Self { messages }
    }
}
