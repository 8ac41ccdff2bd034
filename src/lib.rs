//! Todo chat service.
//!
//! `POST /chat` wraps the caller's prompt in a fixed instruction, runs a
//! tool-using agent whose tools come from a MongoDB MCP server, and returns
//! the agent's answer as plain text after stripping code fences.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod prompt;
pub mod provider;
pub mod sanitize;
pub mod server;
pub mod tools;
pub mod types;

pub use error::{AgentError, Result};
