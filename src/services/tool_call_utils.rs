use crate::error::CrawlerError;
use serde_json::Value;

/// A tool call requested by the model, before its arguments are parsed
pub(super) struct RawToolCall<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub arguments: &'a str,
}

/// Read id, function name and raw argument string from one `tool_calls` entry.
pub(super) fn read_tool_call(tool_call: &Value) -> Result<RawToolCall<'_>, CrawlerError> {
    let id = tool_call
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let function = tool_call.get("function").ok_or_else(|| {
        CrawlerError::InvalidFunctionCall("tool call is missing `function`".to_string())
    })?;

    let name = function
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            CrawlerError::InvalidFunctionCall("tool call is missing a function name".to_string())
        })?;

    let arguments = function
        .get("arguments")
        .and_then(Value::as_str)
        .unwrap_or("");

    Ok(RawToolCall {
        id,
        name,
        arguments,
    })
}

/// Parse function arguments; an empty string means no arguments.
pub(super) fn parse_function_arguments(
    arguments_str: &str,
    function_name: &str,
) -> Result<Value, CrawlerError> {
    if arguments_str.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_str(arguments_str).map_err(|err| {
        CrawlerError::InvalidFunctionCall(format!(
            "failed to parse arguments for tool '{}': {}",
            function_name, err
        ))
    })
}
