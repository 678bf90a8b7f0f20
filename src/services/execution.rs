use super::{
    response_handler::{handle_plain_reply, handle_structured_response, HandlerOutcome},
    tool_call_utils::{parse_function_arguments, read_tool_call},
};
use crate::{
    core::{agent::Agent, memory::AgentMemory, steps::AgentStep},
    error::{CrawlerError, Result},
    schema::{
        deserialize_payload,
        validation::{
            schema_instructions, structured_response_tool_definition,
            STRUCTURED_RESPONSE_TOOL_NAME,
        },
        CompletionSchema, SchemaHandle,
    },
    services::openai_client::ChatCompletionRequest,
    types::result::{RunResult, TokenUsage},
};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info};

impl Agent {
    /// Run the task and decode the accepted payload as `T`.
    pub async fn run<T: CompletionSchema>(&self, task: &str) -> Result<T> {
        let result = self.run_with_steps(task, T::schema()).await?;
        deserialize_payload::<T>(result.structured, T::schema())
    }

    /// Run the tool-calling loop until the model submits a payload that
    /// validates against `schema`, or `max_iterations` turns are spent.
    pub async fn run_with_steps(&self, task: &str, schema: &SchemaHandle) -> Result<RunResult> {
        let start_time = Instant::now();
        let system_prompt = format!("{}\n\n{}", self.instructions(), schema_instructions(schema));
        let mut memory = AgentMemory::new(Some(system_prompt));
        memory.add_step(AgentStep::Task {
            content: task.to_string(),
        });

        let mut tools = self.toolbox().get_openai_tools();
        tools.push(structured_response_tool_definition(schema));

        let mut usage: Option<TokenUsage> = None;

        for iteration in 1..=self.max_iterations() {
            let request_body = ChatCompletionRequest::new(self.model(), memory.as_messages())
                .with_max_tokens(self.max_tokens())
                .with_tools(tools.clone())
                .with_tool_choice(json!("auto"))
                .into_value();

            debug!(
                iteration,
                model = self.model(),
                base_url = self.client().base_url(),
                "requesting completion"
            );
            let response = self.client().chat_completion(&request_body).await?;

            if let Some(turn_usage) = TokenUsage::from_response(&response) {
                usage.get_or_insert_with(TokenUsage::default).add(turn_usage);
            }

            let assistant_message = first_message(&response)?;

            let outcome = match assistant_message
                .get("tool_calls")
                .and_then(Value::as_array)
                .filter(|calls| !calls.is_empty())
            {
                Some(tool_calls) => self.handle_tool_calls(&mut memory, tool_calls, schema).await,
                None => {
                    let content = assistant_message
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    handle_plain_reply(&mut memory, content, schema)
                }
            };

            if let HandlerOutcome::Accept(structured) = outcome {
                info!(
                    schema = schema.schema_name(),
                    iterations = iteration,
                    tool_calls = memory.count_actions(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "structured response accepted"
                );
                let result = RunResult {
                    structured,
                    schema: Some(schema.clone()),
                    steps: memory.into_steps(),
                    tokens: usage,
                    duration: start_time.elapsed(),
                    iterations: iteration,
                };
                debug!("{}", result.replay());
                return Ok(result);
            }
        }

        Err(CrawlerError::MaxIterations(self.max_iterations()))
    }

    async fn handle_tool_calls(
        &self,
        memory: &mut AgentMemory,
        tool_calls: &[Value],
        schema: &SchemaHandle,
    ) -> HandlerOutcome {
        for tool_call in tool_calls {
            let raw = match read_tool_call(tool_call) {
                Ok(raw) => raw,
                Err(err) => {
                    let tool_call_id = tool_call
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    record_failed_call(memory, tool_call_id, "unknown", Value::Null, err);
                    continue;
                }
            };

            let arguments = match parse_function_arguments(raw.arguments, raw.name) {
                Ok(arguments) => arguments,
                Err(err) => {
                    record_failed_call(memory, raw.id, raw.name, json!(raw.arguments), err);
                    continue;
                }
            };

            memory.add_step(AgentStep::Action {
                tool_name: raw.name.to_string(),
                tool_call_id: raw.id.to_string(),
                arguments: arguments.clone(),
            });

            if raw.name == STRUCTURED_RESPONSE_TOOL_NAME {
                match handle_structured_response(memory, raw.id, arguments, schema) {
                    HandlerOutcome::Continue => continue,
                    accepted => return accepted,
                }
            }

            let observation = match self.toolbox().execute_function(raw.name, arguments).await {
                Ok(result) => AgentStep::Observation {
                    tool_call_id: raw.id.to_string(),
                    result: result.to_string(),
                    is_error: false,
                },
                Err(err) => AgentStep::Observation {
                    tool_call_id: raw.id.to_string(),
                    result: err.to_error_payload().to_string(),
                    is_error: true,
                },
            };
            memory.add_step(observation);
        }

        HandlerOutcome::Continue
    }
}

/// Record a malformed call as an action/observation pair so the transcript
/// stays valid for the next request.
fn record_failed_call(
    memory: &mut AgentMemory,
    tool_call_id: &str,
    tool_name: &str,
    arguments: Value,
    error: CrawlerError,
) {
    memory.add_step(AgentStep::Action {
        tool_name: tool_name.to_string(),
        tool_call_id: tool_call_id.to_string(),
        arguments,
    });
    memory.add_step(AgentStep::Observation {
        tool_call_id: tool_call_id.to_string(),
        result: error.to_error_payload().to_string(),
        is_error: true,
    });
}

fn first_message(response: &Value) -> Result<&Value> {
    response
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| CrawlerError::Api("missing 'choices' array in completion response".to_string()))?
        .first()
        .ok_or_else(|| CrawlerError::Api("completion response contained no choices".to_string()))?
        .get("message")
        .ok_or_else(|| CrawlerError::Api("completion response missing assistant message".to_string()))
}
