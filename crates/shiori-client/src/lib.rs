//! # shiori-client
//!
//! HTTP gateway and response cache for the shiori catalog browser.
//!
//! This crate provides:
//! - [`CatalogGateway`]: the `CatalogBackend` implementation over
//!   JSON-over-HTTP, with bearer auth and request-shape fallback
//! - [`ResponseCache`]: fingerprint-keyed TTL cache with namespace
//!   invalidation and an injectable clock
//! - [`CatalogConfig`]: env-driven configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use shiori_client::{CatalogConfig, CatalogGateway};
//! use shiori_core::{CatalogBackend, QueryDescriptor, TitleQuery};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = CatalogGateway::from_env().unwrap();
//!     let query = TitleQuery::first_page(QueryDescriptor::text("ever17"));
//!     let page = gateway.search_titles(&query).await.unwrap();
//!     println!("{} results", page.results.len());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod gateway;

// Re-export core types
pub use shiori_core::*;

pub use cache::{CacheStats, Clock, ResponseCache, SystemClock, NS_LIST, NS_TAG, NS_TITLE};
pub use config::CatalogConfig;
pub use gateway::CatalogGateway;
