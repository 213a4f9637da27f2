//! Read-only JSON API over the catalog store.
//!
//! Route table:
//!
//! ```text
//! /health                      row counts
//! /items                       list
//! /items/{id}                  get
//! /characters                  list
//! /characters/compare?ids=..   side-by-side by name
//! /characters/{id}             get
//! ```

pub mod error;
pub mod handlers;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::store::CatalogStore;
use error::AppError;

/// Shared handler state: the single long-lived store handle of this process.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<CatalogStore>>,
}

impl AppState {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, CatalogStore>, AppError> {
        self.store
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("catalog store lock is poisoned")))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/items", get(handlers::list_items))
        .route("/items/{id}", get(handlers::get_item))
        .route("/characters", get(handlers::list_characters))
        .route("/characters/compare", get(handlers::compare_characters))
        .route("/characters/{id}", get(handlers::get_character))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn serve(store: CatalogStore, host: &str, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    tracing::info!(%local_addr, "serving catalog API");

    axum::serve(listener, router(AppState::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("catalog API server failed")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
