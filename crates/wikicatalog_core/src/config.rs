use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::Catalog;

pub const DEFAULT_API_URL: &str = "https://dontstarve.fandom.com/api.php";
pub const DEFAULT_USER_AGENT: &str = "wikicatalog/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ITEMS_CATEGORY: &str = "Category:Items";
pub const DEFAULT_ITEMS_LIMIT: usize = 500;
pub const DEFAULT_CHARACTERS_CATEGORY: &str = "Category:Characters";
pub const DEFAULT_CHARACTERS_LIMIT: usize = 100;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub catalogs: CatalogsSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CatalogsSection {
    #[serde(default)]
    pub items: CategorySection,
    #[serde(default)]
    pub characters: CategorySection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CategorySection {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl CatalogConfig {
    /// Resolve the wiki API URL: env WIKI_API_URL > config > DEFAULT_API_URL.
    pub fn api_url(&self) -> String {
        env_override("WIKI_API_URL")
            .or_else(|| self.wiki.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Resolve user agent: env WIKI_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        env_override("WIKI_USER_AGENT")
            .or_else(|| self.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn timeout_ms(&self) -> u64 {
        env_override("WIKI_HTTP_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(self.wiki.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn category(&self, catalog: Catalog) -> String {
        let (section, default) = match catalog {
            Catalog::Items => (&self.catalogs.items, DEFAULT_ITEMS_CATEGORY),
            Catalog::Characters => (&self.catalogs.characters, DEFAULT_CHARACTERS_CATEGORY),
        };
        section
            .category
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn limit(&self, catalog: Catalog) -> usize {
        match catalog {
            Catalog::Items => self.catalogs.items.limit.unwrap_or(DEFAULT_ITEMS_LIMIT),
            Catalog::Characters => self
                .catalogs
                .characters
                .limit
                .unwrap_or(DEFAULT_CHARACTERS_LIMIT),
        }
    }

    pub fn host(&self) -> String {
        env_override("WIKICATALOG_HOST")
            .or_else(|| self.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn port(&self) -> u16 {
        env_override("WIKICATALOG_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .or(self.server.port)
            .unwrap_or(DEFAULT_PORT)
    }
}

/// Load and parse a CatalogConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<CatalogConfig> {
    if !config_path.exists() {
        return Ok(CatalogConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: CatalogConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

pub fn render_default_config() -> String {
    format!(
        "# wikicatalog configuration (materialized by `wikicatalog init`)\n\n[wiki]\napi_url = \"{DEFAULT_API_URL}\"\nuser_agent = \"{DEFAULT_USER_AGENT}\"\ntimeout_ms = {DEFAULT_TIMEOUT_MS}\n\n[catalogs.items]\ncategory = \"{DEFAULT_ITEMS_CATEGORY}\"\nlimit = {DEFAULT_ITEMS_LIMIT}\n\n[catalogs.characters]\ncategory = \"{DEFAULT_CHARACTERS_CATEGORY}\"\nlimit = {DEFAULT_CHARACTERS_LIMIT}\n\n[server]\nhost = \"{DEFAULT_HOST}\"\nport = {DEFAULT_PORT}\n"
    )
}

fn env_override(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
