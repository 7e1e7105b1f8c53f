//! Agent event types

use serde::{Deserialize, Serialize};

use crate::conversation::TokenTally;

/// Events emitted during a loop invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Loop started
    AgentStart { model: String },

    /// A completion request is about to be sent
    TurnStart { turn: u32, message_count: usize },

    /// A completion was received
    TurnEnd {
        turn: u32,
        prompt_tokens: u64,
        completion_tokens: u64,
        tally: TokenTally,
        /// Names of the tools requested in this response
        tool_names: Vec<String>,
    },

    /// Tool execution started
    ToolExecutionStart {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution completed
    ToolExecutionEnd {
        tool_call_id: String,
        tool_name: String,
    },

    /// Loop finished with a final answer
    AgentEnd { total_turns: u32, tally: TokenTally },

    /// Loop aborted
    Error { message: String },
}

impl AgentEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::AgentEnd { .. } | AgentEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(
            AgentEvent::Error {
                message: "x".into()
            }
            .is_terminal()
        );
        assert!(
            !AgentEvent::TurnStart {
                turn: 1,
                message_count: 2
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_serialized_tag() {
        let v = serde_json::to_value(AgentEvent::AgentStart {
            model: "m".into(),
        })
        .unwrap();
        assert_eq!(v["type"], "agent_start");
        assert_eq!(v["model"], "m");
    }
}
