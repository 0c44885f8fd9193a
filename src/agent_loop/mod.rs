//! The reasoning loop: model steps, tool calls, and chunked output.

pub mod chunk;
pub mod runner;
pub mod state;

pub use chunk::{OutputChunk, StreamVariant};
pub use runner::{AgentLoop, AgentRun, DEFAULT_MAX_ITERATIONS, DEFAULT_TOOL_GRACE_PERIOD};
pub use state::AgentLoopState;
