use crate::{core::agent::Agent, error::Result, schema::SchemaHandle};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Turns a natural-language instruction into a payload shaped by `schema`.
///
/// Implementations are trusted to browse the target and fill the fields
/// faithfully; the driver only checks the shape of what comes back.
#[async_trait]
pub trait ExtractionCapability: Send + Sync {
    async fn extract(&self, instruction: &str, schema: &SchemaHandle) -> Result<Value>;
}

#[async_trait]
impl<C: ExtractionCapability + ?Sized> ExtractionCapability for Arc<C> {
    async fn extract(&self, instruction: &str, schema: &SchemaHandle) -> Result<Value> {
        self.as_ref().extract(instruction, schema).await
    }
}

/// Extraction backed by the tool-calling [`Agent`]
#[derive(Debug)]
pub struct AgentCapability {
    agent: Agent,
}

impl AgentCapability {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[async_trait]
impl ExtractionCapability for AgentCapability {
    async fn extract(&self, instruction: &str, schema: &SchemaHandle) -> Result<Value> {
        let result = self.agent.run_with_steps(instruction, schema).await?;
        debug!(
            iterations = result.iterations,
            tool_calls = result.action_count(),
            tool_errors = result.errors().len(),
            total_tokens = result.tokens.map(|usage| usage.total_tokens),
            "agent run finished"
        );
        Ok(result.structured)
    }
}
