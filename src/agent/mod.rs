//! The tool-using chat agent.

pub mod conversation;
pub mod result;
pub mod runner;

pub use conversation::Conversation;
pub use result::{AgentResult, TranscriptEntry};
pub use runner::{Agent, ChatAgent};
