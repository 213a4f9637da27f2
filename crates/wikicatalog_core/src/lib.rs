pub mod api;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod runtime;
pub mod store;
pub mod wiki;
