use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{CatalogConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};

/// Transport-level failures talking to the remote wiki. These abort an
/// ingest run; an absent page is not an error and surfaces as empty HTML.
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error("failed to call MediaWiki API")]
    Transport(#[source] reqwest::Error),
    #[error("MediaWiki API request failed with HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode MediaWiki API JSON response")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMember {
    pub title: String,
}

pub trait WikiApi {
    fn list_category_members(&mut self, category: &str, limit: usize)
    -> Result<Vec<CategoryMember>>;
    fn fetch_page_html(&mut self, title: &str) -> Result<String>;
    fn request_count(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct MediaWikiClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for MediaWikiClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl MediaWikiClientConfig {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            api_url: config.api_url(),
            user_agent: config.user_agent(),
            timeout_ms: config.timeout_ms(),
        }
    }
}

pub struct MediaWikiClient {
    client: Client,
    config: MediaWikiClientConfig,
    request_count: usize,
}

impl MediaWikiClient {
    pub fn new(config: MediaWikiClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            client,
            config,
            request_count: 0,
        })
    }

    fn request_json_get(&mut self, params: &[(&str, String)]) -> Result<Value> {
        let base_url = Url::parse(&self.config.api_url)
            .with_context(|| format!("invalid WIKI_API_URL: {}", self.config.api_url))?;

        let mut pairs = Vec::with_capacity(params.len() + 1);
        for (key, value) in params {
            pairs.push(((*key).to_string(), value.clone()));
        }
        pairs.push(("format".to_string(), "json".to_string()));

        self.request_count += 1;
        tracing::debug!(api_url = %base_url, params = ?pairs, "MediaWiki request");

        let response = self
            .client
            .get(base_url)
            .query(&pairs)
            .send()
            .map_err(WikiError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(WikiError::Status(status).into());
        }
        let payload: Value = response.json().map_err(WikiError::Decode)?;
        Ok(payload)
    }
}

impl WikiApi for MediaWikiClient {
    fn list_category_members(
        &mut self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<CategoryMember>> {
        let category_title = category_title(category);
        let response = self
            .request_json_get(&[
                ("action", "query".to_string()),
                ("list", "categorymembers".to_string()),
                ("cmtitle", category_title.clone()),
                ("cmlimit", limit.to_string()),
            ])
            .with_context(|| format!("failed to list members of {category_title}"))?;
        Ok(category_members_from_payload(response))
    }

    fn fetch_page_html(&mut self, title: &str) -> Result<String> {
        let response = self
            .request_json_get(&[
                ("action", "parse".to_string()),
                ("page", title.to_string()),
                ("prop", "text".to_string()),
            ])
            .with_context(|| format!("failed to fetch page {title}"))?;
        Ok(page_html_from_payload(response))
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

pub fn category_title(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.starts_with("Category:") {
        trimmed.to_string()
    } else {
        format!("Category:{trimmed}")
    }
}

/// `query.categorymembers[].title`; any shape mismatch reads as no members.
pub fn category_members_from_payload(payload: Value) -> Vec<CategoryMember> {
    let parsed: QueryResponse = serde_json::from_value(payload).unwrap_or_default();
    parsed
        .query
        .categorymembers
        .into_iter()
        .filter_map(|item| item.title)
        .filter(|title| !title.trim().is_empty())
        .map(|title| CategoryMember { title })
        .collect()
}

/// `parse.text["*"]`, or the plain-string form `parse.text`; empty when the
/// envelope carries no content (missing page, API error envelope).
pub fn page_html_from_payload(payload: Value) -> String {
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        tracing::debug!(code, "MediaWiki parse returned an error envelope");
        return String::new();
    }
    match payload.get("parse").and_then(|parse| parse.get("text")) {
        Some(Value::String(html)) => html.clone(),
        Some(text) => text
            .get("*")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_default(),
        None => String::new(),
    }
}

#[derive(Debug, Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    query: QueryPayload,
}

#[derive(Debug, Deserialize, Default)]
struct QueryPayload {
    #[serde(default)]
    categorymembers: Vec<TitleQueryItem>,
}

#[derive(Debug, Deserialize)]
struct TitleQueryItem {
    #[serde(default)]
    title: Option<String>,
}
