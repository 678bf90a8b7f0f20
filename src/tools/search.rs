use super::{Tool, ToolFuture};
use crate::error::{CrawlerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WebSearchParams {
    /// Search query, e.g. "Acme Capital portfolio exited investments"
    pub query: String,
    /// Number of results to return (1-10)
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// One search hit as shown to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Web search through the Tavily API, for facts the investor site leaves out
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| CrawlerError::Http(format!("failed to create HTTP client: {err}")))?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint: TAVILY_SEARCH_URL.to_string(),
            client,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| CrawlerError::ToolExecution(format!("Tavily request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CrawlerError::ToolExecution(format!(
                "Tavily API error {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: TavilyResponse = response.json().await.map_err(|err| {
            CrawlerError::ToolExecution(format!("failed to parse Tavily response: {err}"))
        })?;
        Ok(parsed.results)
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web. Use it to find an investor's portfolio page or to confirm details the website does not state clearly."
    }

    fn parameters_schema(&self) -> Value {
        let root = schemars::schema_for!(WebSearchParams);
        serde_json::to_value(&root.schema)
            .unwrap_or_else(|_| serde_json::json!({ "type": "object", "properties": {} }))
    }

    fn execute(&self, parameters: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let params: WebSearchParams = serde_path_to_error::deserialize(parameters)
                .map_err(|err| {
                    CrawlerError::ToolExecution(format!(
                        "invalid parameters for `web_search` at {}: {}",
                        err.path(),
                        err.inner()
                    ))
                })?;

            if params.query.trim().is_empty() {
                return Err(CrawlerError::ToolExecution(
                    "search query must not be empty".to_string(),
                ));
            }

            let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS).clamp(1, 10);
            let results = self.search(&params.query, max_results).await?;
            Ok(serde_json::json!({
                "query": params.query,
                "results": results,
            }))
        })
    }
}
