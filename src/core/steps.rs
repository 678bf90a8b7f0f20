use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the agent's run history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStep {
    /// Task handed to the agent for one target
    Task { content: String },
    /// Tool call issued by the model
    Action {
        tool_name: String,
        tool_call_id: String,
        arguments: Value,
    },
    /// Tool result or correction fed back to the model
    Observation {
        tool_call_id: String,
        result: String,
        is_error: bool,
    },
    /// Plain assistant text that did not complete the task
    Reply { content: String },
    /// Nudge sent back after a reply that did not complete the task
    Reminder { content: String },
    /// Accepted structured payload; always the last step of a successful run
    Structured { payload: Value },
}

impl AgentStep {
    /// Chat message for this step; `Structured` closes the run and is never replayed.
    pub fn to_message(&self) -> Option<Value> {
        let message = match self {
            AgentStep::Task { content } => serde_json::json!({
                "role": "user",
                "content": content
            }),
            AgentStep::Action {
                tool_name,
                tool_call_id,
                arguments,
            } => serde_json::json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": tool_call_id,
                    "type": "function",
                    "function": {
                        "name": tool_name,
                        "arguments": arguments.to_string()
                    }
                }]
            }),
            AgentStep::Observation {
                tool_call_id,
                result,
                ..
            } => serde_json::json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "content": result
            }),
            AgentStep::Reply { content } => serde_json::json!({
                "role": "assistant",
                "content": content
            }),
            AgentStep::Reminder { content } => serde_json::json!({
                "role": "user",
                "content": content
            }),
            AgentStep::Structured { .. } => return None,
        };
        Some(message)
    }

    /// Get a human-readable description of the step
    pub fn describe(&self) -> String {
        match self {
            AgentStep::Task { content } => format!("Task: {}", content),
            AgentStep::Action {
                tool_name,
                arguments,
                ..
            } => format!("Action: {}({})", tool_name, arguments),
            AgentStep::Observation {
                result, is_error, ..
            } => {
                if *is_error {
                    format!("Error: {}", truncate_chars(result, 300))
                } else {
                    format!("Observation: {}", truncate_chars(result, 300))
                }
            }
            AgentStep::Reply { content } => format!("Reply: {}", truncate_chars(content, 300)),
            AgentStep::Reminder { content } => format!("Reminder: {}", content),
            AgentStep::Structured { payload } => format!("Structured: {}", payload),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
