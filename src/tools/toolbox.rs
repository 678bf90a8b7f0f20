use super::{tool::ToolRegistry, FetchPageTool, JinaReaderTool, Tool, WebSearchTool};
use crate::error::{CrawlerError, Result};
use serde_json::Value;
use tracing::{debug, info};

/// Tools available to the agent, dispatched by name
#[derive(Debug, Default)]
pub struct Toolbox {
    registry: ToolRegistry,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Browsing tools for investor sites: `fetch_page` always, plus
    /// `jina_reader` and `web_search` when their API keys are given.
    pub fn browsing(jina_api_key: Option<String>, tavily_api_key: Option<String>) -> Result<Self> {
        let mut toolbox = Self::new();
        toolbox.register_tool(FetchPageTool);
        if let Some(key) = jina_api_key {
            toolbox.register_tool(JinaReaderTool::new(key));
        }
        if let Some(key) = tavily_api_key {
            toolbox.register_tool(WebSearchTool::new(key)?);
        }
        info!(tools = ?toolbox.registry.names(), "browsing tools registered");
        Ok(toolbox)
    }

    pub fn register_tool<T: Tool + 'static>(&mut self, tool: T) {
        self.registry.register(tool);
    }

    /// Execute a function call by name
    pub async fn execute_function(&self, function_name: &str, parameters: Value) -> Result<Value> {
        let tool = self
            .registry
            .get(function_name)
            .ok_or_else(|| CrawlerError::ToolNotFound(function_name.to_string()))?;

        debug!(tool = function_name, %parameters, "executing tool");
        tool.execute(parameters).await
    }

    /// Get all available tools for OpenAI function calling
    pub fn get_openai_tools(&self) -> Vec<Value> {
        self.registry.to_openai_tools()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.registry.get(name).is_some()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.registry.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn browsing_tools_depend_on_keys() {
        let toolbox = Toolbox::browsing(None, None).unwrap();
        assert_eq!(toolbox.tool_names(), vec!["fetch_page"]);

        let toolbox =
            Toolbox::browsing(Some("jina".to_string()), Some("tvly".to_string())).unwrap();
        assert_eq!(toolbox.tool_names(), vec!["fetch_page", "jina_reader", "web_search"]);
        assert_eq!(toolbox.get_openai_tools().len(), 3);
        assert!(toolbox.has_function("web_search"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let toolbox = Toolbox::new();
        let err = toolbox
            .execute_function("calculator", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlerError::ToolNotFound(ref name) if name == "calculator"));
    }
}
