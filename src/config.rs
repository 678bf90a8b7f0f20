//! Run configuration, collected and validated before any extraction starts.

use crate::{
    core::agent::{Agent, DEFAULT_MODEL},
    error::{CrawlerError, Result},
    pipeline::{AgentCapability, FailurePolicy, TaskDriver, TaskTemplate},
    services::openai_client::DEFAULT_BASE_URL,
    tools::Toolbox,
};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use url::Url;

pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ITERATIONS: usize = 12;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for OutputFormat {
    type Err = CrawlerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(OutputFormat::Pretty),
            "json" | "jsonl" | "ndjson" => Ok(OutputFormat::Json),
            other => Err(CrawlerError::Config(format!(
                "unknown output format `{other}` (expected `pretty` or `json`)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
        })
    }
}

/// Everything one crawl needs
#[derive(Clone)]
pub struct CrawlerConfig {
    pub targets: Vec<String>,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Deadline for one extraction call, agent loop included
    pub call_timeout: Duration,
    /// Deadline for one HTTP request to the completion endpoint
    pub request_timeout: Duration,
    pub max_iterations: usize,
    pub max_tokens: Option<u32>,
    pub concurrency: usize,
    pub task_template: TaskTemplate,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub failure_policy: FailurePolicy,
    pub jina_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
}

// Hand-written so credentials never reach logs.
impl fmt::Debug for CrawlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlerConfig")
            .field("targets", &self.targets)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("call_timeout", &self.call_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_iterations", &self.max_iterations)
            .field("max_tokens", &self.max_tokens)
            .field("concurrency", &self.concurrency)
            .field("format", &self.format)
            .field("output", &self.output)
            .field("failure_policy", &self.failure_policy)
            .field("jina_reader", &self.jina_api_key.is_some())
            .field("web_search", &self.tavily_api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl CrawlerConfig {
    /// Defaults for everything but the credential and the targets.
    pub fn new(api_key: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            targets,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            concurrency: 1,
            task_template: TaskTemplate::default(),
            format: OutputFormat::default(),
            output: None,
            failure_policy: FailurePolicy::default(),
            jina_api_key: None,
            tavily_api_key: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(CrawlerError::Config(
                "an API key is required: set OPENAI_API_KEY or pass --api-key".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(CrawlerError::Config("model must not be empty".to_string()));
        }
        validate_target(&self.base_url)
            .map_err(|_| CrawlerError::Config(format!("invalid base URL `{}`", self.base_url)))?;
        if self.concurrency == 0 {
            return Err(CrawlerError::Config("concurrency must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(CrawlerError::Config("max iterations must be at least 1".to_string()));
        }
        if self.call_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(CrawlerError::Config("timeouts must be greater than zero".to_string()));
        }
        for target in &self.targets {
            validate_target(target)?;
        }
        Ok(())
    }

    pub fn build_agent(&self) -> Result<Agent> {
        let toolbox = Toolbox::browsing(self.jina_api_key.clone(), self.tavily_api_key.clone())?;
        Agent::new(self.api_key.clone(), toolbox)?
            .with_model(self.model.clone())
            .with_base_url(self.base_url.clone())
            .with_max_iterations(self.max_iterations)
            .with_max_tokens(self.max_tokens)
            .with_request_timeout(self.request_timeout)
    }

    /// Validate the configuration and assemble the agent-backed driver.
    pub fn build_driver(&self) -> Result<TaskDriver<AgentCapability>> {
        self.validate()?;
        Ok(TaskDriver::new(AgentCapability::new(self.build_agent()?))
            .with_template(self.task_template.clone())
            .with_call_timeout(self.call_timeout)
            .with_concurrency(self.concurrency)
            .with_failure_policy(self.failure_policy))
    }
}

/// Targets must be absolute http(s) URLs.
pub fn validate_target(target: &str) -> Result<()> {
    let url = Url::parse(target)
        .map_err(|err| CrawlerError::Config(format!("invalid target URL `{target}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(CrawlerError::Config(format!(
            "target URL `{target}` must be an absolute http or https URL"
        )));
    }
    Ok(())
}

/// Parse a targets file: one URL per line, blank lines and `#` comments skipped.
///
/// A comment is a line starting with `#` or a `#` preceded by whitespace; a
/// `#` inside a URL is its fragment and is kept.
pub fn parse_targets_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| strip_comment(line).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return "";
    }
    trimmed
        .char_indices()
        .find(|&(idx, c)| {
            c == '#' && trimmed[..idx].ends_with(char::is_whitespace)
        })
        .map_or(trimmed, |(idx, _)| &trimmed[..idx])
}

/// Split a comma or whitespace separated URL list, as given in `INVESTOR_URLS`.
pub fn split_target_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve targets in priority order: positional URLs and the targets file
/// (combined, positional first), else the env list.
pub fn resolve_targets(
    positional: Vec<String>,
    targets_file: Option<&std::path::Path>,
    env_list: Option<&str>,
) -> Result<Vec<String>> {
    let mut targets = positional;
    if let Some(path) = targets_file {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            CrawlerError::Config(format!("failed to read targets file {}: {err}", path.display()))
        })?;
        targets.extend(parse_targets_file(&contents));
    }
    if targets.is_empty() {
        if let Some(list) = env_list {
            targets = split_target_list(list);
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CrawlerConfig {
        CrawlerConfig::new("sk-test", vec!["https://www.emeram.com/en/portfolio".to_string()])
    }

    #[test]
    fn defaults_validate() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, "openai/gpt-4.1-mini");
        assert_eq!(config.call_timeout, Duration::from_secs(300));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        let mut missing_key = config();
        missing_key.api_key = " ".to_string();

        let mut zero_concurrency = config();
        zero_concurrency.concurrency = 0;

        let mut zero_timeout = config();
        zero_timeout.call_timeout = Duration::ZERO;

        let mut relative_target = config();
        relative_target.targets.push("www.example.com/portfolio".to_string());

        let mut ftp_target = config();
        ftp_target.targets.push("ftp://example.com".to_string());

        for bad in [missing_key, zero_concurrency, zero_timeout, relative_target, ftp_target] {
            let err = bad.validate().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        }
    }

    #[test]
    fn debug_output_hides_credentials() {
        let mut config = config();
        config.tavily_api_key = Some("tvly-secret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-test"));
        assert!(!rendered.contains("tvly-secret"));
        assert!(rendered.contains("web_search: true"));
    }

    #[test]
    fn targets_file_skips_comments_and_blanks() {
        let contents = "# investors\nhttps://a.example/portfolio\n\n  https://b.example  # exited list\n#https://c.example\n";
        assert_eq!(
            parse_targets_file(contents),
            vec!["https://a.example/portfolio", "https://b.example"]
        );
    }

    #[test]
    fn targets_file_keeps_url_fragments() {
        let contents = "https://vc.example/#/portfolio\nhttps://vc.example/#exits # hash-routed\n\t# indented comment\n";
        assert_eq!(
            parse_targets_file(contents),
            vec!["https://vc.example/#/portfolio", "https://vc.example/#exits"]
        );
    }

    #[test]
    fn env_list_splits_on_commas_and_whitespace() {
        assert_eq!(
            split_target_list("https://a.example, https://b.example\nhttps://c.example,,"),
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
    }

    #[test]
    fn env_list_is_only_a_fallback() {
        let positional = vec!["https://a.example".to_string()];
        assert_eq!(
            resolve_targets(positional, None, Some("https://b.example")).unwrap(),
            vec!["https://a.example"]
        );
        assert_eq!(
            resolve_targets(Vec::new(), None, Some("https://b.example")).unwrap(),
            vec!["https://b.example"]
        );
        assert!(resolve_targets(Vec::new(), None, None).unwrap().is_empty());
    }

    #[test]
    fn missing_targets_file_is_configuration_error() {
        let err = resolve_targets(Vec::new(), Some(std::path::Path::new("/nonexistent/targets.txt")), None)
            .unwrap_err();
        assert!(matches!(err, CrawlerError::Config(_)));
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
