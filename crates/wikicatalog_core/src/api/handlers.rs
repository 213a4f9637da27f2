//! Handlers for `/items`, `/characters` and `/characters/compare`.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::AppState;
use super::error::{AppError, AppResult};
use crate::store::Catalog;

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub ids: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let store = state.lock_store()?;
    Ok(Json(json!({
        "status": "ok",
        "items": store.count(Catalog::Items)?,
        "characters": store.count(Catalog::Characters)?,
    })))
}

/// GET /items
pub async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<Value>>> {
    list_catalog(&state, Catalog::Items)
}

/// GET /items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    get_catalog_entry(&state, Catalog::Items, id)
}

/// GET /characters
pub async fn list_characters(State(state): State<AppState>) -> AppResult<Json<Vec<Value>>> {
    list_catalog(&state, Catalog::Characters)
}

/// GET /characters/{id}
pub async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    get_catalog_entry(&state, Catalog::Characters, id)
}

/// GET /characters/compare?ids=1,2,3
///
/// Side-by-side view keyed by character name. 404 when none of the ids
/// match; unknown ids mixed with known ones are ignored.
pub async fn compare_characters(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> AppResult<Json<Map<String, Value>>> {
    let ids = parse_ids(params.ids.as_deref())?;
    let characters = state
        .lock_store()?
        .find_by_ids(Catalog::Characters, &ids)?;
    if characters.is_empty() {
        return Err(AppError::NotFound);
    }

    let mut comparison = Map::new();
    for character in characters {
        comparison.insert(
            character.name,
            json!({
                "perks": character.field_a,
                "description": character.field_b,
            }),
        );
    }
    Ok(Json(comparison))
}

fn list_catalog(state: &AppState, catalog: Catalog) -> AppResult<Json<Vec<Value>>> {
    let entries = state.lock_store()?.list_all(catalog)?;
    Ok(Json(
        entries.iter().map(|entry| entry.to_json(catalog)).collect(),
    ))
}

fn get_catalog_entry(state: &AppState, catalog: Catalog, id: i64) -> AppResult<Json<Value>> {
    let entry = state
        .lock_store()?
        .find_by_id(catalog, id)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(entry.to_json(catalog)))
}

/// Comma-separated integer list; surrounding whitespace per element is allowed.
fn parse_ids(raw: Option<&str>) -> AppResult<Vec<i64>> {
    let raw = match raw {
        Some(value) if !value.is_empty() => value,
        _ => {
            return Err(AppError::BadRequest(
                "Please provide character IDs to compare.".to_string(),
            ));
        }
    };
    raw.split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AppError::BadRequest("Invalid character IDs.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_ids;
    use crate::api::error::AppError;

    #[test]
    fn parse_ids_accepts_comma_separated_integers() {
        assert_eq!(parse_ids(Some("1,2, 3")).expect("parse"), vec![1, 2, 3]);
        assert_eq!(parse_ids(Some("7")).expect("parse"), vec![7]);
    }

    #[test]
    fn parse_ids_rejects_missing_and_malformed_input() {
        assert!(matches!(parse_ids(None), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_ids(Some("")), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_ids(Some("abc")), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_ids(Some("1,,2")), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_ids(Some("1,x")), Err(AppError::BadRequest(_))));
    }
}
