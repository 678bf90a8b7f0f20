use crate::error::{CrawlerError, Result};

/// Placeholder replaced by the target URL
pub const URL_PLACEHOLDER: &str = "{url}";

/// Task prompt used when no template is configured.
pub const DEFAULT_TASK_TEMPLATE: &str = "Please review the investor website {url} and return the investor name, a short description of the investor, the investor website, the industries it targets, its ticket size and target EV ranges, and every portfolio company listed on the site with the company name, company website, holding status (current, exited, etc.) and transaction date. If the site does not state a value, leave the field as an empty string or an empty list; do not guess.";

/// Per-URL task prompt with a `{url}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    template: String,
}

impl TaskTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(URL_PLACEHOLDER) {
            return Err(CrawlerError::Config(format!(
                "task template must contain the `{URL_PLACEHOLDER}` placeholder"
            )));
        }
        Ok(Self { template })
    }

    pub fn render(&self, url: &str) -> String {
        self.template.replace(URL_PLACEHOLDER, url)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for TaskTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TASK_TEMPLATE.to_string(),
        }
    }
}
