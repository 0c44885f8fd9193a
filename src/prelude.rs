//! Convenience re-exports for common use.

pub use crate::agent_loop::{AgentLoop, AgentRun, OutputChunk, StreamVariant};
pub use crate::backend::{BackendHandle, BackendResolver, BackendSelector, ConfiguredBackend};
pub use crate::config::{GatewayConfig, ProfileStore, UserProfile};
pub use crate::error::{Result, VoiceGitError};
pub use crate::provider::ModelProvider;
pub use crate::session::{multiplex, window, ChatSurface, ChunkSink, LineSource, Session, Turn};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolRegistry};
pub use crate::types::{GenerationSettings, ModelMessage, TextStreamDelta};
