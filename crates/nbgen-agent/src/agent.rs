//! Conversation loop controller

use std::sync::Arc;

use nbgen_ai::{Message, ToolCall, ToolDescriptor};
use tokio::sync::broadcast;

use crate::{
    conversation::{Conversation, TokenTally},
    error::{Error, Result},
    events::AgentEvent,
    interaction_log::InteractionLog,
    registry::ToolRegistry,
    transport::Transport,
};

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Model identifier sent with every completion request
    pub model: String,
    /// Upper bound on completion requests per run. `None` runs until the
    /// model stops asking for tools.
    pub max_iterations: Option<u32>,
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_iterations: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Text of the final assistant message
    pub text: String,
    /// Seed plus every message the loop appended
    pub conversation: Vec<Message>,
    pub tally: TokenTally,
    /// Number of completion requests made
    pub turns: u32,
}

enum LoopState {
    AwaitingModel,
    Done(String),
}

/// Drives the model through tool calls until it produces a final answer
pub struct Agent {
    config: AgentConfig,
    registry: ToolRegistry,
    transport: Arc<dyn Transport>,
    log: Option<InteractionLog>,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Agent {
    /// Create a new agent
    pub fn new(config: AgentConfig, registry: ToolRegistry, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            registry,
            transport,
            log: None,
            event_tx,
        }
    }

    /// Record every completed run in `log`
    pub fn with_log(mut self, log: InteractionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Subscribe to agent events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    pub fn log(&self) -> Option<&InteractionLog> {
        self.log.as_ref()
    }

    /// Run the loop from `seed` until the model answers without tool calls.
    ///
    /// On success exactly one record is appended to the interaction log (if
    /// configured), carrying `metadata`. Any error aborts the run and nothing
    /// is logged.
    pub async fn run(
        &self,
        seed: Vec<Message>,
        metadata: Option<serde_json::Value>,
    ) -> Result<RunOutcome> {
        let result = self.run_loop(seed, metadata.as_ref()).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Agent run failed");
            let _ = self.event_tx.send(AgentEvent::Error {
                message: e.to_string(),
            });
        }
        result
    }

    async fn run_loop(
        &self,
        seed: Vec<Message>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<RunOutcome> {
        let mut conversation = Conversation::seeded(seed)?;
        let mut tally = TokenTally::default();
        let descriptors = self.registry.descriptors();
        let mut turn = 0u32;

        let _ = self.event_tx.send(AgentEvent::AgentStart {
            model: self.config.model.clone(),
        });

        let mut state = LoopState::AwaitingModel;
        let text = loop {
            state = match state {
                LoopState::Done(text) => break text,
                LoopState::AwaitingModel => {
                    if let Some(max) = self.config.max_iterations {
                        if turn >= max {
                            return Err(Error::IterationLimit(max));
                        }
                    }
                    turn += 1;
                    self.step(turn, &mut conversation, &mut tally, &descriptors)
                        .await?
                }
            };
        };

        if let Some(log) = &self.log {
            log.record(
                conversation.seed(),
                &text,
                conversation.messages(),
                tally,
                &self.config.model,
                metadata,
            )?;
        }

        tracing::info!(
            turns = turn,
            prompt_tokens = tally.prompt_tokens,
            completion_tokens = tally.completion_tokens,
            "Agent run complete"
        );
        let _ = self.event_tx.send(AgentEvent::AgentEnd {
            total_turns: turn,
            tally,
        });

        Ok(RunOutcome {
            text,
            conversation: conversation.into_messages(),
            tally,
            turns: turn,
        })
    }

    /// One request/response cycle plus the tool calls it asks for
    async fn step(
        &self,
        turn: u32,
        conversation: &mut Conversation,
        tally: &mut TokenTally,
        descriptors: &[ToolDescriptor],
    ) -> Result<LoopState> {
        let _ = self.event_tx.send(AgentEvent::TurnStart {
            turn,
            message_count: conversation.len(),
        });

        let mut completion = self
            .transport
            .complete(&self.config.model, conversation.messages(), descriptors)
            .await?;

        // Only function calls get a tool response, so nothing else may stay
        // in the assistant message.
        completion.tool_calls.retain(|call| {
            if !call.is_function() {
                tracing::warn!(
                    tool_call_id = %call.id,
                    call_type = %call.call_type,
                    "Dropping non-function tool call"
                );
            }
            call.is_function()
        });

        tally.add(&completion.usage);
        let _ = self.event_tx.send(AgentEvent::TurnEnd {
            turn,
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            tally: *tally,
            tool_names: completion
                .tool_calls
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        });

        conversation.push_assistant(&completion);

        if completion.tool_calls.is_empty() {
            return Ok(LoopState::Done(completion.text().to_string()));
        }

        for call in &completion.tool_calls {
            self.execute_tool_call(call, conversation).await?;
        }
        Ok(LoopState::AwaitingModel)
    }

    async fn execute_tool_call(
        &self,
        call: &ToolCall,
        conversation: &mut Conversation,
    ) -> Result<()> {
        let name = call.name();
        let arguments: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&call.function.arguments).map_err(|source| {
                Error::MalformedArguments {
                    tool: name.to_string(),
                    source,
                }
            })?;
        let arguments = serde_json::Value::Object(arguments);

        tracing::debug!(tool = %name, tool_call_id = %call.id, "Executing tool");
        let _ = self.event_tx.send(AgentEvent::ToolExecutionStart {
            tool_call_id: call.id.clone(),
            tool_name: name.to_string(),
            arguments: arguments.clone(),
        });

        let result = self.registry.dispatch(name, arguments).await?;

        let _ = self.event_tx.send(AgentEvent::ToolExecutionEnd {
            tool_call_id: call.id.clone(),
            tool_name: name.to_string(),
        });

        conversation.push_tool_result(&call.id, name, result.to_string());
        Ok(())
    }
}
