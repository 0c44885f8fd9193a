//! Tool descriptors and the registry handed to the agent loop.

pub mod arguments;
pub mod dynamic;
pub mod registry;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use dynamic::{DynamicTool, DynamicToolAdapter, DynamicToolProvider};
pub use registry::ToolRegistry;
pub use tool::{AgentTool, Tool, ToolExecutionContext};
pub use types::AgentToolParameters;
