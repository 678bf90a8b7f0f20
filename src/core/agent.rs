use crate::{
    error::{CrawlerError, Result},
    services::openai_client::OpenAIClient,
    tools::Toolbox,
};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

/// System instructions used when none are configured.
pub const DEFAULT_INSTRUCTIONS: &str = "You are an investor research agent. Review the given investor website and extract the investor profile and the list of portfolio companies, including their names, websites, holding status (current, exited, etc.), and transaction date. Use the available tools to read the pages you need; follow links to portfolio or exited-investments pages when the list is split across pages. Report only what the website states.";

/// Tool-calling agent that completes a task with a schema-conformant payload
#[derive(Debug)]
pub struct Agent {
    client: OpenAIClient,
    toolbox: Toolbox,
    model: String,
    instructions: String,
    max_iterations: usize,
    max_tokens: Option<u32>,
}

impl Agent {
    pub fn new(api_key: String, toolbox: Toolbox) -> Result<Self> {
        Ok(Self {
            client: OpenAIClient::new(api_key, Duration::from_secs(120))?,
            toolbox,
            model: DEFAULT_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_iterations: 12,
            max_tokens: Some(4096),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.set_base_url(base_url);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the HTTP client so each completion request uses `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client.set_request_timeout(timeout)?;
        Ok(self)
    }

    pub(crate) fn client(&self) -> &OpenAIClient {
        &self.client
    }

    pub(crate) fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn instructions(&self) -> &str {
        &self.instructions
    }

    pub(crate) fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub(crate) fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// Build an agent from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL` /
    /// `OPENROUTER_BASE_URL`.
    pub fn from_env(toolbox: Toolbox) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            CrawlerError::Config(
                "OPENAI_API_KEY environment variable must be set before creating an Agent"
                    .to_string(),
            )
        })?;
        let mut agent = Self::new(api_key, toolbox)?;
        if let Ok(base_url) =
            std::env::var("OPENAI_BASE_URL").or_else(|_| std::env::var("OPENROUTER_BASE_URL"))
        {
            agent.client.set_base_url(base_url);
        }
        Ok(agent)
    }
}
