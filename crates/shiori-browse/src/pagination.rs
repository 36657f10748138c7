//! Load-more pagination over search results.
//!
//! The controller owns the accumulated result window for the active
//! descriptor. [`PaginationController::replace`] starts over from page 1;
//! [`PaginationController::append_next`] extends the window by one page.
//! Appends preserve remote-returned order; no client-side re-sort is
//! applied to the accumulation.
//!
//! Superseded flows are discarded, not cancelled: every fetch captures the
//! controller generation at start and commits nothing if a newer `replace`
//! has bumped it since. A late response therefore never overwrites a newer
//! result set.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use shiori_core::{CatalogBackend, CatalogEntry, QueryDescriptor, Result, TitleQuery};

/// What happened to a fetch once it resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The window was updated with this many new rows.
    Committed(usize),
    /// A newer flow superseded this one; nothing was committed.
    Superseded,
    /// The call did not fetch (already in flight, or no further pages).
    Skipped,
}

struct PageWindow {
    descriptor: QueryDescriptor,
    page: u32,
    has_more: bool,
    entries: Vec<CatalogEntry>,
}

/// Accumulating pagination over one backend.
pub struct PaginationController {
    backend: Arc<dyn CatalogBackend>,
    window: RwLock<PageWindow>,
    generation: AtomicU64,
    fetching: AtomicBool,
}

impl PaginationController {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            window: RwLock::new(PageWindow {
                descriptor: QueryDescriptor::default(),
                page: 1,
                has_more: false,
                entries: Vec::new(),
            }),
            generation: AtomicU64::new(0),
            fetching: AtomicBool::new(false),
        }
    }

    /// Fetch page 1 for a new descriptor, discarding the previous
    /// accumulation. Supersedes any in-flight fetch.
    pub async fn replace(&self, descriptor: QueryDescriptor) -> Result<FetchOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = TitleQuery::first_page(descriptor.clone());
        let fetched = self.backend.search_titles(&query).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "late replace response discarded");
            return Ok(FetchOutcome::Superseded);
        }

        let page = fetched?;
        let mut window = self.window.write().await;
        window.descriptor = descriptor;
        window.page = 1;
        window.has_more = page.more;
        window.entries = page.results;
        debug!(
            op = "replace",
            result_count = window.entries.len(),
            has_more = window.has_more,
            "result window replaced"
        );
        Ok(FetchOutcome::Committed(window.entries.len()))
    }

    /// Fetch the next page for the currently active descriptor and append
    /// it after the existing accumulation. No-op while another append is in
    /// flight or when the remote reported no further pages.
    pub async fn append_next(&self) -> Result<FetchOutcome> {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(FetchOutcome::Skipped);
        }

        let outcome = self.append_inner().await;
        self.fetching.store(false, Ordering::SeqCst);
        outcome
    }

    async fn append_inner(&self) -> Result<FetchOutcome> {
        let (descriptor, next_page) = {
            let window = self.window.read().await;
            if !window.has_more {
                return Ok(FetchOutcome::Skipped);
            }
            (window.descriptor.clone(), window.page + 1)
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let query = TitleQuery {
            descriptor,
            page: next_page,
        };
        let fetched = self.backend.search_titles(&query).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(page = next_page, "late append response discarded");
            return Ok(FetchOutcome::Superseded);
        }

        let page = fetched?;
        let appended = page.results.len();
        let mut window = self.window.write().await;
        window.page = next_page;
        window.has_more = page.more;
        window.entries.extend(page.results);
        debug!(
            op = "append_next",
            page = next_page,
            result_count = appended,
            has_more = window.has_more,
            "page appended"
        );
        Ok(FetchOutcome::Committed(appended))
    }

    /// The accumulated rows, in remote-returned order.
    pub async fn entries(&self) -> Vec<CatalogEntry> {
        self.window.read().await.entries.clone()
    }

    /// Whether the remote reported further pages.
    pub async fn has_more(&self) -> bool {
        self.window.read().await.has_more
    }

    /// The descriptor the window currently belongs to.
    pub async fn descriptor(&self) -> QueryDescriptor {
        self.window.read().await.descriptor.clone()
    }

    /// The highest page fetched so far.
    pub async fn current_page(&self) -> u32 {
        self.window.read().await.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{entry, MockCatalog};

    fn batch(prefix: u64, count: usize) -> Vec<CatalogEntry> {
        (0..count)
            .map(|n| {
                let id = prefix * 1000 + n as u64;
                entry(&format!("v{}", id), &format!("Title {}", id))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_resets_window() {
        let mock = Arc::new(MockCatalog::new());
        let a = QueryDescriptor::text("a");
        let b = QueryDescriptor::text("b");
        mock.script_search(&a, 1, batch(1, 3), true);
        mock.script_search(&b, 1, batch(2, 2), false);

        let controller = PaginationController::new(mock.clone());
        controller.replace(a).await.unwrap();
        assert_eq!(controller.entries().await.len(), 3);
        assert!(controller.has_more().await);

        controller.replace(b).await.unwrap();
        assert_eq!(controller.entries().await.len(), 2);
        assert!(!controller.has_more().await);
        assert_eq!(controller.current_page().await, 1);
    }

    #[tokio::test]
    async fn test_three_appends_accumulate_in_order() {
        let mock = Arc::new(MockCatalog::new());
        let d = QueryDescriptor::text("steins");
        mock.script_search(&d, 1, batch(1, 20), true);
        mock.script_search(&d, 2, batch(2, 20), true);
        mock.script_search(&d, 3, batch(3, 5), false);

        let controller = PaginationController::new(mock.clone());
        controller.replace(d).await.unwrap();

        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Committed(20)
        );
        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Committed(5)
        );
        // No further pages: the third and fourth appends are no-ops.
        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Skipped
        );
        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Skipped
        );

        let entries = controller.entries().await;
        assert_eq!(entries.len(), 45);
        // Remote order preserved across page boundaries
        assert_eq!(entries[0].id.as_str(), "v1000");
        assert_eq!(entries[19].id.as_str(), "v1019");
        assert_eq!(entries[20].id.as_str(), "v2000");
        assert_eq!(entries[44].id.as_str(), "v3004");
        // Pages 1..=3 fetched exactly once each; the no-ops never hit the backend
        assert_eq!(mock.search_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_appended_pages_of_20_20_5_yield_45() {
        let mock = Arc::new(MockCatalog::new());
        let d = QueryDescriptor::text("long");
        mock.script_search(&d, 1, Vec::new(), true);
        mock.script_search(&d, 2, batch(1, 20), true);
        mock.script_search(&d, 3, batch(2, 20), true);
        mock.script_search(&d, 4, batch(3, 5), false);

        let controller = PaginationController::new(mock);
        controller.replace(d).await.unwrap();

        for expected in [20usize, 20, 5] {
            assert_eq!(
                controller.append_next().await.unwrap(),
                FetchOutcome::Committed(expected)
            );
        }
        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Skipped
        );
        assert_eq!(controller.entries().await.len(), 45);
    }

    #[tokio::test]
    async fn test_append_without_replace_is_noop() {
        let mock = Arc::new(MockCatalog::new());
        let controller = PaginationController::new(mock.clone());
        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Skipped
        );
        assert!(mock.search_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_append_is_skipped() {
        let mock = Arc::new(MockCatalog::new());
        let d = QueryDescriptor::text("slowpage");
        mock.script_search(&d, 1, batch(1, 20), true);
        mock.script_search_delayed(&d, 2, 200, batch(2, 20), true);

        let controller = Arc::new(PaginationController::new(mock.clone()));
        controller.replace(d).await.unwrap();

        let background = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.append_next().await.unwrap() })
        };
        // Give the background append time to claim the in-flight flag.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // Rapid second trigger while page 2 is still loading: skipped.
        assert_eq!(
            controller.append_next().await.unwrap(),
            FetchOutcome::Skipped
        );

        assert_eq!(background.await.unwrap(), FetchOutcome::Committed(20));
        assert_eq!(controller.entries().await.len(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_replace_response_is_discarded() {
        let mock = Arc::new(MockCatalog::new());
        let slow = QueryDescriptor::text("slow");
        let fast = QueryDescriptor::text("fast");
        mock.script_search_delayed(&slow, 1, 500, batch(1, 2), false);
        mock.script_search_delayed(&fast, 1, 10, batch(2, 1), false);

        let controller = Arc::new(PaginationController::new(mock.clone()));

        let older = {
            let controller = Arc::clone(&controller);
            let slow = slow.clone();
            tokio::spawn(async move { controller.replace(slow).await.unwrap() })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Newer request starts while the older one is still in flight and
        // resolves first.
        let newer = controller.replace(fast.clone()).await.unwrap();
        assert_eq!(newer, FetchOutcome::Committed(1));

        // The older, slower response arrives last and is discarded.
        assert_eq!(older.await.unwrap(), FetchOutcome::Superseded);
        let entries = controller.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_str(), "v2000");
        assert_eq!(controller.descriptor().await, fast);
    }

    #[tokio::test]
    async fn test_fetch_error_surfaces_when_current() {
        let mock = Arc::new(MockCatalog::new());
        let d = QueryDescriptor::text("down");
        mock.script_search_failure(&d, 1, "connection refused");

        let controller = PaginationController::new(mock);
        let err = controller.replace(d).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_append_error_keeps_accumulation() {
        let mock = Arc::new(MockCatalog::new());
        let d = QueryDescriptor::text("flaky");
        mock.script_search(&d, 1, batch(1, 20), true);
        mock.script_search_failure(&d, 2, "timeout");

        let controller = PaginationController::new(mock);
        controller.replace(d).await.unwrap();
        assert!(controller.append_next().await.is_err());
        // The window is untouched and a retry is possible.
        assert_eq!(controller.entries().await.len(), 20);
        assert!(controller.has_more().await);
        assert_eq!(controller.current_page().await, 1);
    }
}
