//! Conversation state: append-only messages and the token tally.

use nbgen_ai::{Completion, Message, Role, Usage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered, append-only message sequence owned by one loop invocation.
///
/// Seeded by the caller; only the loop extends it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
    seed_len: usize,
}

impl Conversation {
    /// Start a conversation from caller-supplied messages.
    ///
    /// The seed must be non-empty and end with a `user` or `system` turn.
    pub fn seeded(seed: Vec<Message>) -> Result<Self> {
        match seed.last().map(Message::role) {
            None => return Err(Error::InvalidSeed("no messages".into())),
            Some(Role::User | Role::System) => {}
            Some(role) => {
                return Err(Error::InvalidSeed(format!(
                    "last message has role '{}', expected 'user' or 'system'",
                    role.as_str()
                )));
            }
        }

        Ok(Self {
            seed_len: seed.len(),
            messages: seed,
        })
    }

    /// Append the assistant turn for a completion
    pub fn push_assistant(&mut self, completion: &Completion) {
        self.messages.push(completion.to_message());
    }

    /// Append one tool result, answering `tool_call_id`
    pub fn push_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.messages
            .push(Message::tool_result(tool_call_id, name, content));
    }

    /// All messages in chronological order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The caller-seeded prefix
    pub fn seed(&self) -> &[Message] {
        &self.messages[..self.seed_len]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consume the conversation, returning its messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Cumulative token counts across the request/response cycles of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTally {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenTally {
    /// Add one cycle's usage
    pub fn add(&mut self, usage: &Usage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbgen_ai::ToolCall;

    #[test]
    fn test_empty_seed_rejected() {
        let err = Conversation::seeded(vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidSeed(_)));
    }

    #[test]
    fn test_seed_ending_with_assistant_rejected() {
        let err = Conversation::seeded(vec![
            Message::user("hi"),
            Message::assistant(Some("hello".into()), vec![]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("assistant"), "got: {}", err);
    }

    #[test]
    fn test_seed_ending_with_system_accepted() {
        let conv = Conversation::seeded(vec![Message::system("be brief")]).unwrap();
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_seed_prefix_is_stable() {
        let seed = vec![Message::system("sys"), Message::user("q")];
        let mut conv = Conversation::seeded(seed.clone()).unwrap();
        conv.push_assistant(&Completion {
            content: None,
            tool_calls: vec![ToolCall::function("c1", "t", "{}")],
            usage: Usage::default(),
        });
        conv.push_tool_result("c1", "t", "{}");

        assert_eq!(conv.seed(), seed.as_slice());
        assert_eq!(conv.len(), 4);
        assert_eq!(conv.messages()[2].role(), Role::Assistant);
        assert_eq!(conv.messages()[3].role(), Role::Tool);
    }

    #[test]
    fn test_tally_accumulates() {
        let mut tally = TokenTally::default();
        tally.add(&Usage {
            prompt_tokens: 10,
            completion_tokens: 2,
        });
        tally.add(&Usage {
            prompt_tokens: 15,
            completion_tokens: 5,
        });
        assert_eq!(tally.prompt_tokens, 25);
        assert_eq!(tally.completion_tokens, 7);
        assert_eq!(tally.total(), 32);
    }
}
