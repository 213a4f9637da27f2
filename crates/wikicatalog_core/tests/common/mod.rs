use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use tower::ServiceExt;

use wikicatalog_core::api::{AppState, router};
use wikicatalog_core::store::{Catalog, CatalogStore, NewCatalogEntry};

/// In-memory store seeded with one item and one character.
pub fn seeded_store() -> CatalogStore {
    let store = CatalogStore::open_in_memory().expect("open store");
    store
        .insert(
            Catalog::Items,
            &NewCatalogEntry {
                name: "Test Item".to_string(),
                field_a: Some("Wood, Stone".to_string()),
                field_b: Some("Crafting".to_string()),
            },
        )
        .expect("seed item");
    store
        .insert(
            Catalog::Characters,
            &NewCatalogEntry {
                name: "Wolfgang".to_string(),
                field_a: Some("Combat boost".to_string()),
                field_b: Some("Strong and fearless".to_string()),
            },
        )
        .expect("seed character");
    store
}

pub fn build_test_app(store: CatalogStore) -> Router {
    router(AppState::new(store))
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request"),
    )
    .await
    .expect("router is infallible")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body is JSON")
}
