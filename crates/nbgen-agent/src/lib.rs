//! nbgen-agent: tool-augmented completion loop
//!
//! This crate drives a chat model through tool calls until it produces a
//! final answer, and records each completed run in an append-only log.

pub mod agent;
pub mod conversation;
pub mod error;
pub mod events;
pub mod interaction_log;
pub mod registry;
pub mod tool;
pub mod transport;

pub use agent::{Agent, AgentConfig, RunOutcome};
pub use conversation::{Conversation, TokenTally};
pub use error::{BoxError, Error, Result};
pub use events::AgentEvent;
pub use interaction_log::{InteractionLog, InteractionRecord};
pub use registry::ToolRegistry;
pub use tool::{BoxedTool, Tool, ToolOutput, parse_arguments};
pub use transport::{ProviderTransport, Transport};
