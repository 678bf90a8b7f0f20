use super::{CompletionSchema, SchemaHandle};
use crate::error::{CrawlerError, Result};
use jsonschema::{Draft, JSONSchema};
use serde::Deserialize;
use serde_json::{json, Value};
use std::any::{type_name, TypeId};

const MAX_SCHEMA_ERRORS: usize = 3;
pub(crate) const STRUCTURED_RESPONSE_TOOL_NAME: &str = "structured_response";

/// Arguments for the structured_response tool
#[derive(Deserialize)]
pub(crate) struct StructuredResponseArguments {
    pub structured: Value,
}

/// Validate a payload against a schema, reporting at most three violations.
pub fn validate_payload(schema: &SchemaHandle, payload: &Value) -> Result<()> {
    if !payload.is_object() {
        return Err(CrawlerError::SchemaConformance(format!(
            "`{}` payload must be a JSON object, got {}",
            schema.schema_name(),
            json_type(payload)
        )));
    }

    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            CrawlerError::SchemaConformance(format!(
                "failed to prepare `{}` schema for validation: {}",
                schema.schema_name(),
                err
            ))
        })?;

    if let Err(errors) = validator.validate(payload) {
        let mut details = Vec::new();
        let mut truncated = false;

        for (idx, error) in errors.enumerate() {
            if idx == MAX_SCHEMA_ERRORS {
                truncated = true;
                break;
            }
            let path = error.instance_path.to_string();
            let location = if path.is_empty() { "<root>" } else { &path };
            details.push(format!("{}: {}", location, error));
        }

        let mut detail_str = if details.is_empty() {
            "payload failed schema validation".to_string()
        } else {
            details.join("; ")
        };
        if truncated {
            detail_str.push_str("; additional errors truncated");
        }

        return Err(CrawlerError::SchemaConformance(format!(
            "payload does not match `{}` schema: {}",
            schema.schema_name(),
            detail_str
        )));
    }

    Ok(())
}

/// Decode a validated payload into its target type.
pub fn deserialize_payload<T>(payload: Value, schema: &SchemaHandle) -> Result<T>
where
    T: CompletionSchema,
{
    if schema.type_id() != TypeId::of::<T>() {
        return Err(CrawlerError::SchemaConformance(format!(
            "schema `{}` does not match target type `{}`",
            schema.schema_name(),
            type_name::<T>(),
        )));
    }

    serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        CrawlerError::SchemaConformance(format!(
            "failed to deserialize `{}` at {}: {}",
            schema.schema_name(),
            location,
            err.inner()
        ))
    })
}

/// Required top-level fields the capability left empty (`""`, `[]` or `null`).
///
/// These are not failures: an empty field means the data could not be found.
pub fn empty_required_fields(schema: &SchemaHandle, payload: &Value) -> Vec<String> {
    schema
        .required_fields()
        .into_iter()
        .filter(|field| match payload.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        })
        .map(str::to_string)
        .collect()
}

/// Tool definition that embeds the target schema as the `structured` parameter.
pub(crate) fn structured_response_tool_definition(schema: &SchemaHandle) -> Value {
    let mut structured = serde_json::Map::new();
    structured.insert("type".to_string(), json!("object"));
    structured.insert(
        "description".to_string(),
        json!(format!(
            "The {} data structure. This must match the schema exactly; use empty strings or empty lists for anything you cannot find.",
            schema.schema_name()
        )),
    );
    for key in ["properties", "required"] {
        if let Some(value) = schema.schema_json().get(key) {
            structured.insert(key.to_string(), value.clone());
        }
    }
    structured.insert("additionalProperties".to_string(), json!(false));

    json!({
        "type": "function",
        "function": {
            "name": STRUCTURED_RESPONSE_TOOL_NAME,
            "description": format!(
                "Complete the task by providing a {} object with all required fields.",
                schema.schema_name()
            ),
            "parameters": {
                "type": "object",
                "properties": { "structured": structured },
                "required": ["structured"],
                "additionalProperties": false
            }
        }
    })
}

/// Completion requirement appended to the system prompt.
pub(crate) fn schema_instructions(schema: &SchemaHandle) -> String {
    format!(
        "Structured response requirement: when you finish the task, you MUST call the `{}` tool with a JSON payload that strictly conforms to the `{}` schema. Every required field must be present; when a value cannot be found, use an empty string or an empty list instead of inventing one. This is the ONLY way to complete the task.",
        STRUCTURED_RESPONSE_TOOL_NAME,
        schema.schema_name()
    )
}

/// Parse a plain assistant reply as a JSON object, tolerating a markdown fence.
pub(crate) fn parse_json_content(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
