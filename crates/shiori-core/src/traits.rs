//! The backend seam between the browsing layer and the catalog gateway.
//!
//! The browse crate only ever talks to [`CatalogBackend`]; the HTTP gateway
//! implements it, and tests substitute scripted in-memory backends.

use async_trait::async_trait;

use crate::error::Result;
use crate::ids::EntityId;
use crate::models::{AuthInfo, CatalogEntry, ListRecord, ListView, Page, Status, TagInfo};
use crate::query::TitleQuery;

/// Remote catalog operations.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Execute one page of a search query.
    async fn search_titles(&self, query: &TitleQuery) -> Result<Page<CatalogEntry>>;

    /// Batch lookup by identifier set, at most
    /// [`crate::defaults::HYDRATION_CHUNK_SIZE`] ids per call.
    async fn lookup_titles(&self, ids: &[EntityId]) -> Result<Vec<CatalogEntry>>;

    /// Tag metadata for display enrichment. `Ok(None)` when the tag does
    /// not exist; callers treat any `Err` as best-effort and degrade.
    async fn fetch_tag(&self, id: &EntityId) -> Result<Option<TagInfo>>;

    /// Introspect the configured credential.
    async fn auth_info(&self) -> Result<AuthInfo>;

    /// One page of the user's personal list, in the requested projection.
    async fn list_page(
        &self,
        user: &EntityId,
        page: u32,
        view: ListView,
    ) -> Result<Page<ListRecord>>;

    /// Replace the label set of a personal-list entry.
    async fn set_labels(&self, id: &EntityId, labels: &[u32]) -> Result<()>;

    /// Make `status` the entry's only status label.
    async fn assign_status(&self, id: &EntityId, status: Status) -> Result<()>;

    /// Remove an entry from the personal list.
    async fn remove_entry(&self, id: &EntityId) -> Result<()>;
}
