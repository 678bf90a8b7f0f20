use crate::{
    core::{memory::AgentMemory, steps::AgentStep},
    error::CrawlerError,
    schema::{
        validate_payload,
        validation::{parse_json_content, StructuredResponseArguments, STRUCTURED_RESPONSE_TOOL_NAME},
        SchemaHandle,
    },
};
use serde_json::Value;
use tracing::debug;

/// What the execution loop should do after a completion attempt
#[derive(Debug)]
pub(super) enum HandlerOutcome {
    /// Keep iterating; feedback has been recorded in memory
    Continue,
    /// The payload passed validation
    Accept(Value),
}

fn report_error(memory: &mut AgentMemory, tool_call_id: &str, error: CrawlerError) {
    memory.add_step(AgentStep::Observation {
        tool_call_id: tool_call_id.to_string(),
        result: error.to_error_payload().to_string(),
        is_error: true,
    });
}

/// Handle a `structured_response` tool call.
///
/// Invalid payloads become error observations so the model can correct them
/// on its next turn.
pub(super) fn handle_structured_response(
    memory: &mut AgentMemory,
    tool_call_id: &str,
    arguments_json: Value,
    schema: &SchemaHandle,
) -> HandlerOutcome {
    let args = match serde_json::from_value::<StructuredResponseArguments>(arguments_json) {
        Ok(args) => args,
        Err(err) => {
            report_error(
                memory,
                tool_call_id,
                CrawlerError::InvalidFunctionCall(format!(
                    "invalid {} arguments: {}",
                    STRUCTURED_RESPONSE_TOOL_NAME, err
                )),
            );
            return HandlerOutcome::Continue;
        }
    };

    if let Err(err) = validate_payload(schema, &args.structured) {
        debug!(
            target: "investor_crawler::schema",
            schema = schema.schema_name(),
            error = %err,
            payload = %args.structured
        );
        report_error(memory, tool_call_id, err);
        return HandlerOutcome::Continue;
    }

    memory.add_step(AgentStep::Structured {
        payload: args.structured.clone(),
    });
    HandlerOutcome::Accept(args.structured)
}

/// Handle an assistant turn without tool calls.
///
/// A reply that is itself a schema-valid JSON object is accepted; anything
/// else is recorded and answered with a reminder to call the completion tool.
pub(super) fn handle_plain_reply(
    memory: &mut AgentMemory,
    content: &str,
    schema: &SchemaHandle,
) -> HandlerOutcome {
    let content = content.trim();

    if let Some(payload) = parse_json_content(content) {
        if validate_payload(schema, &payload).is_ok() {
            memory.add_step(AgentStep::Structured {
                payload: payload.clone(),
            });
            return HandlerOutcome::Accept(payload);
        }
    }

    let reminder = if content.is_empty() {
        format!(
            "Reminder: call the `{}` tool with the `{}` payload to complete the task.",
            STRUCTURED_RESPONSE_TOOL_NAME,
            schema.schema_name()
        )
    } else {
        memory.add_step(AgentStep::Reply {
            content: content.to_string(),
        });
        format!(
            "Reminder: do not answer in plain text. Call the `{}` tool with the `{}` payload instead.",
            STRUCTURED_RESPONSE_TOOL_NAME,
            schema.schema_name()
        )
    };

    memory.add_step(AgentStep::Reminder { content: reminder });
    HandlerOutcome::Continue
}
