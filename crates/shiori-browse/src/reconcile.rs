//! Personal-list reconciliation.
//!
//! Two independent read paths over the same remote list:
//!
//! 1. [`PersonalListReconciler::membership_set`] — a lightweight paged
//!    sweep of identifiers only, bounded to a fixed page count, feeding the
//!    "already added" badge on search results.
//! 2. [`PersonalListReconciler::full_list`] — the heavier paged fetch that
//!    produces the personal-list view model. Entries the remote returned
//!    without display data are placeholders; they are deduplicated,
//!    chunked, and hydrated through the batch identifier lookup. Entries
//!    the batch could not resolve keep their placeholder form, never
//!    dropped, so the list count stays accurate.
//!
//! The two paths observe the remote independently; a mutation landing
//! between them can make them disagree until the next refresh.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use shiori_core::{
    defaults, CatalogBackend, CatalogEntry, EntityId, ListRecord, ListView, Result, Status,
};

/// One row of the personal-list view model.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub record: ListRecord,
    /// Derived from the row's labels; display code may fall back to
    /// [`Status::display_default`] but that default is never written back.
    pub status: Option<Status>,
}

/// Fetches and normalizes the caller's personal list.
pub struct PersonalListReconciler {
    backend: Arc<dyn CatalogBackend>,
}

impl PersonalListReconciler {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self { backend }
    }

    /// The set of titles in the user's list, for membership badges.
    ///
    /// Sweeps identifier-only pages until the remote reports no more, or
    /// the page bound is hit; a partial set only under-badges.
    pub async fn membership_set(&self, user: &EntityId) -> Result<HashSet<EntityId>> {
        let mut set = HashSet::new();
        let mut page = 1;
        loop {
            let batch = self
                .backend
                .list_page(user, page, ListView::Membership)
                .await?;
            set.extend(batch.results.into_iter().map(|record| record.id));

            if !batch.more {
                break;
            }
            if page >= defaults::MEMBERSHIP_PAGE_LIMIT {
                warn!(page, "membership sweep hit page bound, set may be partial");
                break;
            }
            page += 1;
        }
        debug!(op = "membership_set", result_count = set.len(), "membership swept");
        Ok(set)
    }

    /// The full personal list, hydrated and with statuses derived.
    pub async fn full_list(&self, user: &EntityId) -> Result<Vec<ListRow>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.backend.list_page(user, page, ListView::Full).await?;
            let fetched = batch.results.len();
            records.extend(batch.results);
            if !batch.more || fetched == 0 {
                break;
            }
            page += 1;
        }

        self.hydrate(&mut records).await;

        let rows = records
            .into_iter()
            .map(|record| {
                let status = Status::derive(&record.labels);
                ListRow { record, status }
            })
            .collect::<Vec<_>>();
        debug!(op = "full_list", result_count = rows.len(), "personal list assembled");
        Ok(rows)
    }

    /// Replace placeholder rows with full records by normalized-identifier
    /// match. Hydration failures degrade to placeholders, never to dropped
    /// rows.
    async fn hydrate(&self, records: &mut [ListRecord]) {
        let pending: BTreeSet<EntityId> = records
            .iter()
            .filter(|record| record.is_placeholder())
            .map(|record| record.id.clone())
            .collect();
        if pending.is_empty() {
            return;
        }

        let ids: Vec<EntityId> = pending.into_iter().collect();
        let batches = futures::future::join_all(
            ids.chunks(defaults::HYDRATION_CHUNK_SIZE)
                .map(|chunk| self.backend.lookup_titles(chunk)),
        )
        .await;

        let mut resolved: HashMap<EntityId, CatalogEntry> = HashMap::new();
        for outcome in batches {
            match outcome {
                Ok(found) => {
                    for entry in found {
                        resolved.insert(entry.id.clone(), entry);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "hydration batch failed, placeholders kept");
                }
            }
        }
        debug!(
            op = "hydrate",
            requested = ids.len(),
            resolved = resolved.len(),
            "placeholders hydrated"
        );

        for record in records.iter_mut() {
            if record.is_placeholder() {
                if let Some(entry) = resolved.get(&record.id) {
                    record.entry = entry.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{entry, list_record, MockCatalog};
    use shiori_core::EntityKind;

    fn user() -> EntityId {
        EntityId::normalize(EntityKind::User, "u2")
    }

    fn title_id(raw: &str) -> EntityId {
        EntityId::normalize(EntityKind::Title, raw)
    }

    #[tokio::test]
    async fn test_membership_sweeps_until_no_more() {
        let mock = Arc::new(MockCatalog::new());
        mock.script_list_page(
            ListView::Membership,
            1,
            vec![list_record("v1", "", &[]), list_record("v2", "", &[])],
            true,
        );
        mock.script_list_page(ListView::Membership, 2, vec![list_record("v3", "", &[])], false);

        let reconciler = PersonalListReconciler::new(mock.clone());
        let set = reconciler.membership_set(&user()).await.unwrap();

        assert_eq!(set.len(), 3);
        assert!(set.contains(&title_id("v2")));
        assert_eq!(mock.list_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_membership_stops_at_page_bound() {
        let mock = Arc::new(MockCatalog::new());
        // A pathological account: every page claims more.
        for page in 1..=defaults::MEMBERSHIP_PAGE_LIMIT + 5 {
            mock.script_list_page(
                ListView::Membership,
                page,
                vec![list_record(&format!("v{}", page), "", &[])],
                true,
            );
        }

        let reconciler = PersonalListReconciler::new(mock.clone());
        let set = reconciler.membership_set(&user()).await.unwrap();

        assert_eq!(mock.list_calls().len(), defaults::MEMBERSHIP_PAGE_LIMIT as usize);
        assert_eq!(set.len(), defaults::MEMBERSHIP_PAGE_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_hydration_only_for_placeholders() {
        let mock = Arc::new(MockCatalog::new());
        mock.script_list_page(
            ListView::Full,
            1,
            vec![
                list_record("v1", "", &[5]),
                list_record("v2", "Known", &[2]),
            ],
            false,
        );

        let reconciler = PersonalListReconciler::new(mock.clone());
        let rows = reconciler.full_list(&user()).await.unwrap();

        // Only v1 needed hydration; the batch returned no match for it, so
        // its placeholder survives and the list count stays accurate.
        let lookups = mock.lookup_calls();
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0], vec![title_id("v1")]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.id, title_id("v1"));
        assert!(rows[0].record.is_placeholder());
        assert_eq!(rows[1].record.entry.title, "Known");
    }

    #[tokio::test]
    async fn test_hydration_replaces_placeholder_by_normalized_id() {
        let mock = Arc::new(MockCatalog::new());
        mock.script_list_page(
            ListView::Full,
            1,
            vec![list_record("v1", "", &[1]), list_record("v2", "Known", &[2])],
            false,
        );
        mock.add_lookup_entry(entry("v1", "Hydrated"));

        let reconciler = PersonalListReconciler::new(mock);
        let rows = reconciler.full_list(&user()).await.unwrap();

        assert_eq!(rows[0].record.entry.title, "Hydrated");
        // Labels belong to the list entry, not the hydrated record.
        assert_eq!(rows[0].record.labels, vec![1]);
        assert_eq!(rows[0].status, Some(Status::Playing));
    }

    #[tokio::test]
    async fn test_hydration_deduplicates_and_chunks() {
        let mock = Arc::new(MockCatalog::new());
        // 150 distinct placeholders plus one duplicate id across pages.
        let mut page1 = Vec::new();
        let mut page2 = Vec::new();
        for n in 0..75 {
            page1.push(list_record(&format!("v{}", n), "", &[]));
        }
        for n in 75..150 {
            page2.push(list_record(&format!("v{}", n), "", &[]));
        }
        page2.push(list_record("v0", "", &[]));
        mock.script_list_page(ListView::Full, 1, page1, true);
        mock.script_list_page(ListView::Full, 2, page2, false);

        let reconciler = PersonalListReconciler::new(mock.clone());
        let rows = reconciler.full_list(&user()).await.unwrap();
        assert_eq!(rows.len(), 151);

        let lookups = mock.lookup_calls();
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[0].len(), defaults::HYDRATION_CHUNK_SIZE);
        assert_eq!(lookups[1].len(), 50);
        // The duplicate id appears in exactly one chunk.
        let total: usize = lookups.iter().map(Vec::len).sum();
        assert_eq!(total, 150);
    }

    #[tokio::test]
    async fn test_status_derivation_on_rows() {
        let mock = Arc::new(MockCatalog::new());
        mock.script_list_page(
            ListView::Full,
            1,
            vec![
                list_record("v1", "A", &[4, 2]),
                list_record("v2", "B", &[6]),
                list_record("v3", "C", &[11]),
            ],
            false,
        );

        let reconciler = PersonalListReconciler::new(mock);
        let rows = reconciler.full_list(&user()).await.unwrap();

        assert_eq!(rows[0].status, Some(Status::Finished));
        assert_eq!(rows[1].status, Some(Status::Blacklist));
        // A custom-only label set has no derived status.
        assert_eq!(rows[2].status, None);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let mock = Arc::new(MockCatalog::new());
        let reconciler = PersonalListReconciler::new(mock.clone());

        let rows = reconciler.full_list(&user()).await.unwrap();
        assert!(rows.is_empty());
        assert!(mock.lookup_calls().is_empty());

        let set = reconciler.membership_set(&user()).await.unwrap();
        assert!(set.is_empty());
    }
}
