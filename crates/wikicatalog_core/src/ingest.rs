use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::CatalogConfig;
use crate::extract::{EntryFields, extract_character_entry, extract_item_entry};
use crate::store::{Catalog, CatalogStore, NewCatalogEntry};
use crate::wiki::WikiApi;

/// Everything that differs between the item and character sync.
#[derive(Debug, Clone)]
pub struct CatalogProfile {
    pub catalog: Catalog,
    pub category: String,
    pub limit: usize,
    pub extract: fn(&str) -> EntryFields,
}

impl CatalogProfile {
    pub fn items(category: impl Into<String>, limit: usize) -> Self {
        Self {
            catalog: Catalog::Items,
            category: category.into(),
            limit,
            extract: extract_item_entry,
        }
    }

    pub fn characters(category: impl Into<String>, limit: usize) -> Self {
        Self {
            catalog: Catalog::Characters,
            category: category.into(),
            limit,
            extract: extract_character_entry,
        }
    }

    pub fn from_config(catalog: Catalog, config: &CatalogConfig) -> Self {
        let category = config.category(catalog);
        let limit = config.limit(catalog);
        match catalog {
            Catalog::Items => Self::items(category, limit),
            Catalog::Characters => Self::characters(category, limit),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Record a per-page transport failure as `failed` and keep going
    /// instead of aborting the run. Listing failures stay fatal.
    pub isolate_fetch_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestAction {
    Added,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub title: String,
    pub action: IngestAction,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub catalog: Catalog,
    pub category: String,
    pub listed: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<IngestOutcome>,
    pub request_count: usize,
}

impl IngestReport {
    fn new(profile: &CatalogProfile) -> Self {
        Self {
            catalog: profile.catalog,
            category: profile.category.clone(),
            listed: 0,
            added: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
            request_count: 0,
        }
    }

    fn record(&mut self, title: &str, action: IngestAction, detail: Option<String>) {
        match action {
            IngestAction::Added => self.added += 1,
            IngestAction::Skipped => self.skipped += 1,
            IngestAction::Failed => self.failed += 1,
        }
        self.outcomes.push(IngestOutcome {
            title: title.to_string(),
            action,
            detail,
        });
    }
}

/// One sequential sync of a catalog: list, then per member
/// skip-if-present / fetch / extract / insert.
pub fn run_ingest<A: WikiApi>(
    api: &mut A,
    store: &CatalogStore,
    profile: &CatalogProfile,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let catalog = profile.catalog.as_str();
    let mut report = IngestReport::new(profile);
    let requests_before = api.request_count();

    let members = api.list_category_members(&profile.category, profile.limit)?;
    report.listed = members.len();
    tracing::info!(
        catalog,
        category = %profile.category,
        count = members.len(),
        "fetched category members from the wiki"
    );

    for member in &members {
        let title = member.title.as_str();
        if store.find_by_name(profile.catalog, title)?.is_some() {
            tracing::debug!(catalog, title, "already stored, skipping");
            report.record(title, IngestAction::Skipped, Some("already stored".to_string()));
            continue;
        }

        let html = match api.fetch_page_html(title) {
            Ok(html) => html,
            Err(error) if options.isolate_fetch_errors => {
                tracing::warn!(catalog, title, error = %format!("{error:#}"), "page fetch failed");
                report.record(title, IngestAction::Failed, Some(format!("{error:#}")));
                continue;
            }
            Err(error) => return Err(error),
        };

        if html.trim().is_empty() {
            tracing::warn!(catalog, title, "failed to fetch details");
            report.record(
                title,
                IngestAction::Failed,
                Some("failed to fetch details".to_string()),
            );
            continue;
        }

        let fields = (profile.extract)(&html);
        let entry = store
            .insert(
                profile.catalog,
                &NewCatalogEntry {
                    name: title.to_string(),
                    field_a: fields.field_a,
                    field_b: fields.field_b,
                },
            )
            .with_context(|| format!("failed to store {catalog} entry {title}"))?;
        tracing::info!(catalog, title, id = entry.id, "added entry");
        report.record(title, IngestAction::Added, None);
    }

    report.request_count = api.request_count() - requests_before;
    tracing::info!(
        catalog,
        added = report.added,
        skipped = report.skipped,
        failed = report.failed,
        "ingest finished"
    );
    Ok(report)
}
