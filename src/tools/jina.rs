use super::{Tool, ToolFuture};
use crate::error::CrawlerError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JINA_READER_ENDPOINT: &str = "https://r.jina.ai/";

/// Parameters accepted by the Jina reader tool
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct JinaReaderParams {
    /// Fully-qualified URL to read (e.g. <https://www.example.com/portfolio>)
    pub url: String,
    /// When true, bypass cached snapshot
    #[serde(default)]
    pub no_cache: Option<bool>,
}

/// Page returned by Jina reader, split into its header fields
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JinaReaderResponse {
    pub title: Option<String>,
    pub url_source: Option<String>,
    pub published_time: Option<String>,
    pub markdown: Option<String>,
}

/// Reads a page through the Jina reader API, which renders JavaScript-heavy
/// portfolio pages into markdown.
#[derive(Debug, Clone)]
pub struct JinaReaderTool {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl JinaReaderTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: JINA_READER_ENDPOINT.to_string(),
            client: Client::new(),
        }
    }

    /// Point the tool at another reader endpoint (used by tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn reader_url(&self, url: &str) -> String {
        if url.starts_with(&self.endpoint) {
            url.to_string()
        } else {
            format!("{}/{}", self.endpoint.trim_end_matches('/'), url)
        }
    }
}

impl Tool for JinaReaderTool {
    fn name(&self) -> &'static str {
        "jina_reader"
    }

    fn description(&self) -> &'static str {
        "Read a web page as markdown through the Jina reader API. Use this when fetch_page returns little text, e.g. for pages rendered with JavaScript."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Fully qualified URL to read"
                },
                "no_cache": {
                    "type": "boolean",
                    "description": "Set true to bypass cached snapshot"
                }
            },
            "required": ["url"]
        })
    }

    fn execute(&self, parameters: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let params: JinaReaderParams = serde_path_to_error::deserialize(parameters)
                .map_err(|err| {
                    CrawlerError::ToolExecution(format!(
                        "invalid parameters for `jina_reader` at {}: {}",
                        err.path(),
                        err.inner()
                    ))
                })?;

            let mut request = self
                .client
                .get(self.reader_url(&params.url))
                .bearer_auth(&self.api_key);

            if params.no_cache.unwrap_or(false) {
                request = request.header("Cache-Control", "no-cache");
            }

            let response = request.send().await.map_err(|err| {
                CrawlerError::ToolExecution(format!("failed to call Jina reader: {err}"))
            })?;

            if !response.status().is_success() {
                return Err(CrawlerError::ToolExecution(format!(
                    "Jina reader returned status {} for {}",
                    response.status(),
                    params.url
                )));
            }

            let body = response.text().await.map_err(|err| {
                CrawlerError::ToolExecution(format!("failed to read Jina response: {err}"))
            })?;

            Ok(serde_json::to_value(parse_jina_response(&body))?)
        })
    }
}

fn parse_jina_response(raw: &str) -> JinaReaderResponse {
    let mut title = None;
    let mut url_source = None;
    let mut published_time = None;
    let mut markdown_lines: Vec<&str> = Vec::new();
    let mut in_markdown = false;

    for line in raw.lines() {
        if in_markdown {
            markdown_lines.push(line);
            continue;
        }

        if let Some(value) = line.strip_prefix("Title: ") {
            title = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("URL Source: ") {
            url_source = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Published Time: ") {
            published_time = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Markdown Content:") {
            in_markdown = true;
            let trimmed = value.trim_start();
            if !trimmed.is_empty() {
                markdown_lines.push(trimmed);
            }
        }
    }

    // Reader responses without the header block are plain markdown.
    let markdown = if in_markdown {
        Some(markdown_lines.join("\n"))
    } else if title.is_none() && url_source.is_none() {
        Some(raw.to_string())
    } else {
        None
    };

    JinaReaderResponse {
        title,
        url_source,
        published_time,
        markdown: markdown.filter(|text| !text.trim().is_empty()),
    }
}
