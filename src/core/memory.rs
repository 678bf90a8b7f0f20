use super::steps::AgentStep;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Run history for one extraction, replayed to the model on every turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMemory {
    steps: Vec<AgentStep>,
    system_prompt: Option<String>,
}

impl AgentMemory {
    pub fn new(system_prompt: Option<String>) -> Self {
        Self {
            steps: Vec::new(),
            system_prompt,
        }
    }

    pub fn add_step(&mut self, step: AgentStep) {
        debug!(target: "investor_crawler::steps", "{}", step.describe());
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<AgentStep> {
        self.steps
    }

    pub fn last_step(&self) -> Option<&AgentStep> {
        self.steps.last()
    }

    /// Convert memory to OpenAI message format
    pub fn as_messages(&self) -> Vec<Value> {
        let system = self.system_prompt.as_ref().map(|prompt| {
            serde_json::json!({
                "role": "system",
                "content": prompt
            })
        });

        system
            .into_iter()
            .chain(self.steps.iter().filter_map(AgentStep::to_message))
            .collect()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn count_actions(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, AgentStep::Action { .. }))
            .count()
    }

    pub fn count_errors(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, AgentStep::Observation { is_error: true, .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_creation() {
        let memory = AgentMemory::new(Some("System".to_string()));
        assert_eq!(memory.step_count(), 0);
        assert!(memory.is_empty());
        assert_eq!(memory.as_messages().len(), 1);
    }

    #[test]
    fn test_as_messages() {
        let mut memory = AgentMemory::new(Some("Extract investors".to_string()));
        memory.add_step(AgentStep::Task {
            content: "https://example.com/portfolio".to_string(),
        });
        memory.add_step(AgentStep::Structured {
            payload: Value::Null,
        });

        let messages = memory.as_messages();
        assert_eq!(messages.len(), 2); // system + task
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn test_counts() {
        let mut memory = AgentMemory::new(None);
        memory.add_step(AgentStep::Action {
            tool_name: "fetch_page".to_string(),
            tool_call_id: "1".to_string(),
            arguments: Value::Null,
        });
        memory.add_step(AgentStep::Observation {
            tool_call_id: "1".to_string(),
            result: "HTTP 404".to_string(),
            is_error: true,
        });
        assert_eq!(memory.count_actions(), 1);
        assert_eq!(memory.count_errors(), 1);
        assert!(matches!(
            memory.last_step(),
            Some(AgentStep::Observation { is_error: true, .. })
        ));
    }
}
