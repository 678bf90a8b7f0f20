use crate::{
    core::steps::AgentStep,
    error::Result,
    schema::{deserialize_payload, CompletionSchema, SchemaHandle},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Result of one agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema-valid payload the run completed with
    pub structured: Value,
    /// Schema the payload was validated against
    #[serde(skip)]
    pub schema: Option<SchemaHandle>,
    /// All steps taken during the run
    pub steps: Vec<AgentStep>,
    /// Token usage summed over every completion call, if the API reported it
    pub tokens: Option<TokenUsage>,
    /// Total execution duration
    pub duration: Duration,
    /// Number of model turns used
    pub iterations: usize,
}

/// Token usage information from the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn from_response(response: &Value) -> Option<Self> {
        let usage = response.get("usage")?;
        let field = |name: &str| {
            usage
                .get(name)
                .and_then(Value::as_u64)
                .map(|v| v.min(u32::MAX as u64) as u32)
        };
        Some(Self {
            prompt_tokens: field("prompt_tokens")?,
            completion_tokens: field("completion_tokens")?,
            total_tokens: field("total_tokens")?,
        })
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

impl RunResult {
    /// Generate a human-readable replay of the execution
    pub fn replay(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Agent Execution Trace ===".to_string());
        lines.push(format!("Duration: {:.2}s", self.duration.as_secs_f64()));
        lines.push(format!("Iterations: {}", self.iterations));

        if let Some(tokens) = &self.tokens {
            lines.push(format!(
                "Tokens: {} prompt + {} completion = {} total",
                tokens.prompt_tokens, tokens.completion_tokens, tokens.total_tokens
            ));
        }

        lines.push(String::new());
        lines.push("--- Steps ---".to_string());
        for (idx, step) in self.steps.iter().enumerate() {
            lines.push(format!("{}. {}", idx + 1, step.describe()));
        }

        lines.join("\n")
    }

    /// Decode the payload using the stored schema metadata.
    pub fn deserialize_structured<T>(&self) -> Result<T>
    where
        T: CompletionSchema,
    {
        let schema = self.schema.as_ref().unwrap_or_else(|| T::schema());
        deserialize_payload::<T>(self.structured.clone(), schema)
    }

    /// Get count of tool calls executed
    pub fn action_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, AgentStep::Action { .. }))
            .count()
    }

    /// Get all error observations
    pub fn errors(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                AgentStep::Observation {
                    result,
                    is_error: true,
                    ..
                } => Some(result.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::investor::Investor;
    use serde_json::json;

    fn sample_result(steps: Vec<AgentStep>) -> RunResult {
        RunResult {
            structured: json!({
                "investor_name": "Acme Capital",
                "investor_description": "",
                "investor_website": "https://acme.example",
                "portfolio_companies": [],
                "target_industry": [],
                "ticket_size": "",
                "target_EV": ""
            }),
            schema: Some(Investor::schema().clone()),
            steps,
            tokens: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            }),
            duration: Duration::from_secs(2),
            iterations: 2,
        }
    }

    #[test]
    fn test_replay_format() {
        let result = sample_result(vec![
            AgentStep::Task {
                content: "Review https://acme.example".to_string(),
            },
            AgentStep::Action {
                tool_name: "fetch_page".to_string(),
                tool_call_id: "1".to_string(),
                arguments: json!({ "url": "https://acme.example" }),
            },
        ]);

        let replay = result.replay();
        assert!(replay.contains("Duration: 2.00s"));
        assert!(replay.contains("Tokens: 100 prompt + 50 completion = 150 total"));
        assert!(replay.contains("1. Task: Review https://acme.example"));
        assert!(replay.contains("2. Action: fetch_page"));
        assert_eq!(result.action_count(), 1);
    }

    #[test]
    fn test_error_tracking() {
        let result = sample_result(vec![
            AgentStep::Observation {
                tool_call_id: "1".to_string(),
                result: "HTTP 503".to_string(),
                is_error: true,
            },
            AgentStep::Observation {
                tool_call_id: "2".to_string(),
                result: "<html>".to_string(),
                is_error: false,
            },
        ]);

        assert_eq!(result.errors(), vec!["HTTP 503"]);
    }

    #[test]
    fn test_deserialize_structured_payload() {
        let typed: Investor = sample_result(Vec::new()).deserialize_structured().unwrap();
        assert_eq!(typed.investor_name, "Acme Capital");
    }

    #[test]
    fn token_usage_is_read_and_summed() {
        let mut total = TokenUsage::default();
        let response = json!({
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        });
        total.add(TokenUsage::from_response(&response).unwrap());
        total.add(TokenUsage::from_response(&response).unwrap());
        assert_eq!(total.total_tokens, 30);
        assert!(TokenUsage::from_response(&json!({})).is_none());
    }
}
