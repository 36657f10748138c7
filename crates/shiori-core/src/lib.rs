//! # shiori-core
//!
//! Core types, traits, and abstractions for the shiori catalog browser.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the client and browse crates depend on: canonical
//! identifiers, query descriptors, filter expression trees, the wire-record
//! decode layer, and the backend trait the browsing layer is written
//! against.

pub mod defaults;
pub mod error;
pub mod filter_expr;
pub mod ids;
pub mod logging;
pub mod models;
pub mod query;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter_expr::{build_filters, id_batch, CompareOp, FilterExpr};
pub use ids::{EntityId, EntityKind};
pub use models::{
    AuthInfo, AuthInfoRecord, CatalogEntry, CoverImage, ImageRecord, LabelRef, ListEntryRecord,
    ListRecord, ListView, Page, RawId, Status, TagInfo, TagRecord, TitleRecord, TitleRef,
};
pub use query::{
    FilterState, QueryDescriptor, QueryKind, SortDirection, SortField, SortState, TitleQuery,
};
pub use traits::CatalogBackend;
