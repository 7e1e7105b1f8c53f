//! Console progress lines for agent events

use nbgen_agent::AgentEvent;
use tokio::sync::broadcast;

/// Tokens in thousands, truncated to one decimal
fn kilo(tokens: u64) -> String {
    format!("{:.1}", (tokens / 100) as f64 / 10.0)
}

/// Render one event as a progress line, if it has one
pub fn format_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::AgentStart { model } => Some(format!("Using model: {}", model)),
        AgentEvent::TurnStart { message_count, .. } => Some(format!(
            "Num. messages in conversation: {}\nSubmitting completion request...",
            message_count
        )),
        AgentEvent::TurnEnd {
            prompt_tokens,
            completion_tokens,
            tally,
            tool_names,
            ..
        } => Some(format!(
            "TOKENS: {} prompt, {} completion; total: {} prompt, {} completion\nTool calls: [{}]",
            kilo(*prompt_tokens),
            kilo(*completion_tokens),
            kilo(tally.prompt_tokens),
            kilo(tally.completion_tokens),
            tool_names.join(", ")
        )),
        AgentEvent::ToolExecutionStart {
            tool_name,
            arguments,
            ..
        } => Some(format!("Executing tool: {} with args: {}", tool_name, arguments)),
        AgentEvent::ToolExecutionEnd { .. } => None,
        AgentEvent::AgentEnd { total_turns, tally } => Some(format!(
            "Finished after {} completion requests ({} tokens)",
            total_turns,
            tally.total()
        )),
        // surfaced by the caller
        AgentEvent::Error { .. } => None,
    }
}

/// Print progress lines until a terminal event arrives or the agent is dropped
pub async fn print_events(mut receiver: broadcast::Receiver<AgentEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if let Some(line) = format_event(&event) {
                    println!("{}", line);
                }
                if event.is_terminal() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Progress output fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
