//! `fetch_page`: plain HTTP fetch with HTML reduced to text and links.

use crawler_macros::tool;
use schemars::JsonSchema;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Longest page text handed back to the model, in characters
pub const MAX_TEXT_CHARS: usize = 40_000;
/// Most links reported per page
pub const MAX_LINKS: usize = 200;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; investor-crawler/0.1; +https://github.com/investor-crawler/investor-crawler)";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchPageParams {
    /// Absolute http(s) URL of the page to fetch
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub href: String,
    pub text: String,
}

/// Readable view of a fetched page
#[derive(Debug, Clone, Serialize)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub title: Option<String>,
    pub text: String,
    pub truncated: bool,
    pub links: Vec<PageLink>,
}

tool!(
    name = "fetch_page",
    description = "Fetch a web page and return its title, visible text and the links it contains. Use it to read the investor website and follow links to portfolio, team or exited-investment pages.",
    params = FetchPageParams,
    |params: FetchPageParams| async move {
        let page = fetch_page(&params.url).await?;
        serde_json::to_value(page).map_err(|err| err.to_string())
    }
);

async fn fetch_page(url: &str) -> std::result::Result<FetchedPage, String> {
    let base = Url::parse(url).map_err(|err| format!("invalid url `{url}`: {err}"))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(format!("unsupported url scheme `{}`", base.scheme()));
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|err| format!("failed to build HTTP client: {err}"))?;

    let response = client
        .get(base.clone())
        .send()
        .await
        .map_err(|err| format!("request to {url} failed: {err}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status} for {url}"));
    }

    // Links resolve against the final URL after redirects.
    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|err| format!("failed to read body of {url}: {err}"))?;

    Ok(parse_page(&final_url, status.as_u16(), &body))
}

/// Reduce an HTML document to its title, visible text and outgoing links.
pub fn parse_page(url: &Url, status: u16, html: &str) -> FetchedPage {
    let document = Html::parse_document(html);
    let (text, truncated) = truncate_text(&visible_text(&document), MAX_TEXT_CHARS);

    FetchedPage {
        url: url.to_string(),
        status,
        title: page_title(&document),
        text,
        truncated,
        links: page_links(&document, url),
    }
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|title| !title.is_empty())
}

fn visible_text(document: &Html) -> String {
    let mut lines = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().is_some_and(|el| {
                matches!(el.name(), "script" | "style" | "noscript" | "template" | "head")
            })
        });
        if hidden {
            continue;
        }
        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.join("\n")
}

fn page_links(document: &Html, base: &Url) -> Vec<PageLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let mut resolved = base.join(href.trim()).ok()?;
            if !matches!(resolved.scheme(), "http" | "https") {
                return None;
            }
            resolved.set_fragment(None);
            Some(PageLink {
                href: resolved.to_string(),
                text: collapse_whitespace(&el.text().collect::<String>()),
            })
        })
        .filter(|link| seen.insert(link.href.clone()))
        .take(MAX_LINKS)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_text(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}
