//! Model Context Protocol client for the MongoDB tool server.

pub mod bridge;
pub mod client;
pub mod schema;
pub mod transport;

pub use bridge::MCPToolAdapter;
pub use client::{MCPClient, MCPSession};
pub use transport::{MCPTransport, StdioTransport};
