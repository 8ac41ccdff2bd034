//! Tool abstraction the agent calls through.

pub mod arguments;
pub mod dynamic;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use dynamic::{DynamicTool, DynamicToolAdapter, DynamicToolProvider};
pub use tool::{AgentTool, Tool};
pub use types::AgentToolParameters;
