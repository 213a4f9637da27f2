use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;

const CATALOG_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    ingredients TEXT,
    obtaining_method TEXT
);

CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    perks TEXT,
    description TEXT
);
"#;

/// One of the two independent entity namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Catalog {
    Items,
    Characters,
}

impl Catalog {
    pub const ALL: [Catalog; 2] = [Catalog::Items, Catalog::Characters];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Characters => "characters",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "items" | "item" => Ok(Self::Items),
            "characters" | "character" => Ok(Self::Characters),
            other => anyhow::bail!("unknown catalog: {other} (expected items|characters)"),
        }
    }

    fn table(self) -> &'static str {
        self.as_str()
    }

    /// Column names backing `field_a` and `field_b`.
    pub fn field_columns(self) -> (&'static str, &'static str) {
        match self {
            Self::Items => ("ingredients", "obtaining_method"),
            Self::Characters => ("perks", "description"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub field_a: Option<String>,
    pub field_b: Option<String>,
}

impl CatalogEntry {
    /// Render with the catalog's own field names, e.g.
    /// `{id, name, ingredients, obtaining_method}` for items.
    pub fn to_json(&self, catalog: Catalog) -> serde_json::Value {
        let (field_a, field_b) = catalog.field_columns();
        let mut object = serde_json::Map::new();
        object.insert("id".to_string(), self.id.into());
        object.insert("name".to_string(), self.name.clone().into());
        object.insert(field_a.to_string(), self.field_a.clone().into());
        object.insert(field_b.to_string(), self.field_b.clone().into());
        serde_json::Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub name: String,
    pub field_a: Option<String>,
    pub field_b: Option<String>,
}

pub struct CatalogStore {
    connection: Connection,
}

impl CatalogStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create database parent directory {}",
                    parent.display()
                )
            })?;
        }
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        connection
            .busy_timeout(Duration::from_secs(5))
            .context("failed to set sqlite busy timeout")?;
        connection
            .pragma_update(None, "journal_mode", "WAL")
            .context("failed to enable WAL journal mode")?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory sqlite database")?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection
            .execute_batch(CATALOG_SCHEMA_SQL)
            .context("failed to initialize catalog schema")?;
        Ok(Self { connection })
    }

    pub fn find_by_name(&self, catalog: Catalog, name: &str) -> Result<Option<CatalogEntry>> {
        let sql = format!("{} WHERE name = ?1 LIMIT 1", select_sql(catalog));
        self.connection
            .query_row(&sql, [name], entry_from_row)
            .optional()
            .with_context(|| format!("failed to look up {} by name {name}", catalog.as_str()))
    }

    pub fn insert(&self, catalog: Catalog, entry: &NewCatalogEntry) -> Result<CatalogEntry> {
        let (field_a, field_b) = catalog.field_columns();
        let sql = format!(
            "INSERT INTO {} (name, {field_a}, {field_b}) VALUES (?1, ?2, ?3)",
            catalog.table()
        );
        self.connection
            .execute(&sql, params![entry.name, entry.field_a, entry.field_b])
            .with_context(|| format!("failed to insert {} row {}", catalog.as_str(), entry.name))?;
        Ok(CatalogEntry {
            id: self.connection.last_insert_rowid(),
            name: entry.name.clone(),
            field_a: entry.field_a.clone(),
            field_b: entry.field_b.clone(),
        })
    }

    pub fn list_all(&self, catalog: Catalog) -> Result<Vec<CatalogEntry>> {
        let sql = format!("{} ORDER BY id", select_sql(catalog));
        let mut statement = self
            .connection
            .prepare(&sql)
            .with_context(|| format!("failed to prepare {} listing", catalog.as_str()))?;
        let rows = statement
            .query_map([], entry_from_row)
            .with_context(|| format!("failed to list {}", catalog.as_str()))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.with_context(|| format!("failed to decode {} row", catalog.as_str()))?);
        }
        Ok(out)
    }

    pub fn find_by_id(&self, catalog: Catalog, id: i64) -> Result<Option<CatalogEntry>> {
        let sql = format!("{} WHERE id = ?1", select_sql(catalog));
        self.connection
            .query_row(&sql, [id], entry_from_row)
            .optional()
            .with_context(|| format!("failed to look up {} by id {id}", catalog.as_str()))
    }

    pub fn find_by_ids(&self, catalog: Catalog, ids: &[i64]) -> Result<Vec<CatalogEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=ids.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "{} WHERE id IN ({placeholders}) ORDER BY id",
            select_sql(catalog)
        );
        let mut statement = self
            .connection
            .prepare(&sql)
            .with_context(|| format!("failed to prepare {} id lookup", catalog.as_str()))?;
        let rows = statement
            .query_map(params_from_iter(ids.iter()), entry_from_row)
            .with_context(|| format!("failed to look up {} by ids", catalog.as_str()))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.with_context(|| format!("failed to decode {} row", catalog.as_str()))?);
        }
        Ok(out)
    }

    pub fn count(&self, catalog: Catalog) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", catalog.table());
        let count: i64 = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count {}", catalog.as_str()))?;
        usize::try_from(count).context("row count does not fit into usize")
    }
}

fn select_sql(catalog: Catalog) -> String {
    let (field_a, field_b) = catalog.field_columns();
    format!(
        "SELECT id, name, {field_a}, {field_b} FROM {}",
        catalog.table()
    )
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        field_a: row.get(2)?,
        field_b: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{Catalog, CatalogStore, NewCatalogEntry};

    fn new_entry(name: &str, field_a: Option<&str>, field_b: Option<&str>) -> NewCatalogEntry {
        NewCatalogEntry {
            name: name.to_string(),
            field_a: field_a.map(ToString::to_string),
            field_b: field_b.map(ToString::to_string),
        }
    }

    #[test]
    fn insert_assigns_id_and_round_trips_through_lookups() {
        let store = CatalogStore::open_in_memory().expect("open store");
        let inserted = store
            .insert(
                Catalog::Items,
                &new_entry("Test Item", Some("Wood, Stone"), Some("Crafting")),
            )
            .expect("insert");

        assert!(inserted.id > 0);
        let by_id = store
            .find_by_id(Catalog::Items, inserted.id)
            .expect("find by id")
            .expect("row present");
        assert_eq!(by_id, inserted);
        let by_name = store
            .find_by_name(Catalog::Items, "Test Item")
            .expect("find by name")
            .expect("row present");
        assert_eq!(by_name.id, inserted.id);
        assert_eq!(by_name.field_a.as_deref(), Some("Wood, Stone"));
    }

    #[test]
    fn catalogs_are_separate_namespaces() {
        let store = CatalogStore::open_in_memory().expect("open store");
        store
            .insert(Catalog::Items, &new_entry("Wilson", None, None))
            .expect("insert item");
        store
            .insert(
                Catalog::Characters,
                &new_entry("Wilson", Some("Grows a beard"), None),
            )
            .expect("same name in another catalog");

        assert_eq!(store.count(Catalog::Items).expect("count"), 1);
        assert_eq!(store.count(Catalog::Characters).expect("count"), 1);
    }

    #[test]
    fn duplicate_name_in_one_catalog_is_rejected() {
        let store = CatalogStore::open_in_memory().expect("open store");
        store
            .insert(Catalog::Characters, &new_entry("Willow", None, None))
            .expect("first insert");
        let err = store
            .insert(Catalog::Characters, &new_entry("Willow", None, None))
            .expect_err("must fail");
        assert!(err.to_string().contains("failed to insert characters row Willow"));
    }

    #[test]
    fn find_by_ids_ignores_unknown_ids_and_orders_by_id() {
        let store = CatalogStore::open_in_memory().expect("open store");
        let first = store
            .insert(Catalog::Characters, &new_entry("Wilson", None, None))
            .expect("insert");
        let second = store
            .insert(Catalog::Characters, &new_entry("Willow", None, None))
            .expect("insert");

        let found = store
            .find_by_ids(Catalog::Characters, &[second.id, 999, first.id, second.id])
            .expect("find by ids");
        let names = found.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Wilson", "Willow"]);
        assert!(
            store
                .find_by_ids(Catalog::Characters, &[])
                .expect("empty lookup")
                .is_empty()
        );
    }

    #[test]
    fn missing_rows_are_none() {
        let store = CatalogStore::open_in_memory().expect("open store");
        assert!(store.find_by_id(Catalog::Items, 1).expect("lookup").is_none());
        assert!(
            store
                .find_by_name(Catalog::Items, "Nope")
                .expect("lookup")
                .is_none()
        );
        assert!(store.list_all(Catalog::Items).expect("list").is_empty());
    }

    #[test]
    fn open_creates_parent_dirs_and_persists() {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("nested").join("catalog.db");
        {
            let store = CatalogStore::open(&db_path).expect("open store");
            store
                .insert(Catalog::Items, &new_entry("Rope", Some("Cut Grass"), None))
                .expect("insert");
        }
        let reopened = CatalogStore::open(&db_path).expect("reopen store");
        let items = reopened.list_all(Catalog::Items).expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Rope");
    }

    #[test]
    fn entry_json_uses_catalog_field_names() {
        let store = CatalogStore::open_in_memory().expect("open store");
        let entry = store
            .insert(
                Catalog::Characters,
                &new_entry("Wolfgang", Some("Combat boost"), None),
            )
            .expect("insert");
        let json = entry.to_json(Catalog::Characters);
        assert_eq!(json["name"], "Wolfgang");
        assert_eq!(json["perks"], "Combat boost");
        assert!(json["description"].is_null());
        assert!(json.get("field_a").is_none());
    }

    #[test]
    fn catalog_parse_accepts_singular_and_plural() {
        assert_eq!(Catalog::parse("Items").expect("parse"), Catalog::Items);
        assert_eq!(
            Catalog::parse("character").expect("parse"),
            Catalog::Characters
        );
        assert!(Catalog::parse("recipes").is_err());
    }
}
