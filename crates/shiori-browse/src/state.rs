//! The list-browsing state machine.
//!
//! [`Browser`] owns the active [`QueryDescriptor`] and coordinates every
//! user-facing browsing action: debounced live search, immediate
//! tag/developer queries, sort changes, infinite scroll, and the toggle
//! between search results and the personal list. It runs for the lifetime
//! of the browsing session and is re-entrant on every action; there is no
//! terminal state.
//!
//! In-flight requests are never cancelled. Each asynchronous flow captures
//! a staleness token at start (the paginator generation for search flows,
//! the list epoch for personal-list flows) and commits nothing if a newer
//! flow has started since; a superseded flow's late response is silently
//! discarded. Shared maps are replaced wholesale, never mutated field by
//! field, so a reader between suspension points never observes a
//! half-updated structure.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use shiori_core::{
    defaults, CatalogBackend, CatalogEntry, EntityId, QueryDescriptor, Result, SortDirection,
    SortField, SortState, Status, TagInfo,
};

use crate::pagination::{FetchOutcome, PaginationController};
use crate::reconcile::{ListRow, PersonalListReconciler};

/// Which result set the session is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    Search,
    PersonalList,
}

/// Lifecycle of the active query.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseState {
    Idle,
    Loading(QueryDescriptor),
    Loaded(QueryDescriptor),
    Error {
        descriptor: QueryDescriptor,
        message: String,
    },
}

/// One search result annotated with personal-list membership.
///
/// `in_list` is `None` while the membership set has not been evaluated
/// yet, which is distinct from "known not in list".
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedEntry {
    pub entry: CatalogEntry,
    pub in_list: Option<bool>,
    pub status: Option<Status>,
}

/// Everything presentation needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseSnapshot {
    pub mode: BrowseMode,
    pub state: BrowseState,
    /// Search-mode rows, annotated.
    pub results: Vec<AnnotatedEntry>,
    /// Personal-list rows, client-side sorted.
    pub list_rows: Vec<ListRow>,
    /// Metadata for the selected tag, when enrichment succeeded.
    pub active_tag: Option<TagInfo>,
    /// Set once a flow failed with an invalid credential; the caller must
    /// drop any persisted credential and fall back to a public view.
    pub auth_expired: bool,
}

struct Shared {
    mode: BrowseMode,
    state: BrowseState,
    /// Last search-mode descriptor; restored when leaving the personal list.
    last_search: QueryDescriptor,
    membership: Option<HashSet<EntityId>>,
    statuses: HashMap<EntityId, Status>,
    /// Personal-list rows in fetch order; sorting is applied on read.
    list_rows: Vec<ListRow>,
    list_sort: SortState,
    active_tag: Option<TagInfo>,
    auth_expired: bool,
}

/// The top-level browsing controller.
pub struct Browser {
    backend: Arc<dyn CatalogBackend>,
    paginator: PaginationController,
    reconciler: PersonalListReconciler,
    shared: RwLock<Shared>,
    /// Debounce token: only the task holding the latest value fires.
    input_seq: AtomicU64,
    /// Staleness token for personal-list flows.
    list_epoch: AtomicU64,
}

impl Browser {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            paginator: PaginationController::new(Arc::clone(&backend)),
            reconciler: PersonalListReconciler::new(Arc::clone(&backend)),
            backend,
            shared: RwLock::new(Shared {
                mode: BrowseMode::Search,
                state: BrowseState::Idle,
                last_search: QueryDescriptor::default(),
                membership: None,
                statuses: HashMap::new(),
                list_rows: Vec::new(),
                list_sort: SortState::default(),
                active_tag: None,
                auth_expired: false,
            }),
            input_seq: AtomicU64::new(0),
            list_epoch: AtomicU64::new(0),
        }
    }

    /// A live-typed change to the search box.
    ///
    /// Starts a fresh quiet period; only the task belonging to the latest
    /// keystroke submits, and only if the session is still in search mode
    /// when the timer fires.
    pub fn note_term_input(self: &Arc<Self>, term: impl Into<String>) {
        let term = term.into();
        let seq = self.input_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let browser = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(defaults::DEBOUNCE_MS)).await;
            if browser.input_seq.load(Ordering::SeqCst) != seq {
                return;
            }
            let descriptor = {
                let shared = browser.shared.read().await;
                if shared.mode != BrowseMode::Search {
                    return;
                }
                QueryDescriptor::text(term)
                    .with_filters(shared.last_search.filters.clone())
                    .with_sort(shared.last_search.sort)
            };
            browser.submit(descriptor).await;
        });
    }

    /// An external tag selection: immediate, no debounce, forces search
    /// mode. Tag metadata is fetched best-effort for display only.
    pub async fn select_tag(&self, tag_id: EntityId) {
        let descriptor = {
            let mut shared = self.shared.write().await;
            shared.mode = BrowseMode::Search;
            shared.active_tag = None;
            QueryDescriptor::tag(tag_id.clone())
                .with_filters(shared.last_search.filters.clone())
                .with_sort(shared.last_search.sort)
        };
        self.submit(descriptor).await;

        match self.backend.fetch_tag(&tag_id).await {
            Ok(tag) => {
                self.shared.write().await.active_tag = tag;
            }
            Err(e) => {
                // Enrichment only; its absence degrades display, never
                // correctness.
                debug!(error = %e, "tag metadata fetch failed");
            }
        }
    }

    /// An external developer selection: immediate, no debounce, forces
    /// search mode.
    pub async fn select_developer(&self, developer_id: EntityId) {
        let descriptor = {
            let mut shared = self.shared.write().await;
            shared.mode = BrowseMode::Search;
            shared.active_tag = None;
            QueryDescriptor::developer(developer_id)
                .with_filters(shared.last_search.filters.clone())
                .with_sort(shared.last_search.sort)
        };
        self.submit(descriptor).await;
    }

    /// Replace the content filters and re-run the active query.
    pub async fn change_filters(&self, filters: shiori_core::FilterState) {
        let descriptor = {
            let shared = self.shared.read().await;
            shared.last_search.clone().with_filters(filters)
        };
        self.submit(descriptor).await;
    }

    /// A sort change. In search mode this re-issues the query with the new
    /// sort; in personal-list mode the accumulated rows are re-sorted
    /// client-side, because list fetches are not sortable server-side.
    pub async fn change_sort(&self, sort: SortState) {
        let mode = self.shared.read().await.mode;
        match mode {
            BrowseMode::Search => {
                let descriptor = {
                    let shared = self.shared.read().await;
                    shared.last_search.clone().with_sort(sort)
                };
                self.submit(descriptor).await;
            }
            BrowseMode::PersonalList => {
                let mut shared = self.shared.write().await;
                shared.list_sort = sort;
                // Keep the descriptor's sort in step so returning to
                // search mode starts from the same choice.
                shared.last_search = shared.last_search.clone().with_sort(sort);
                debug!(op = "change_sort", "personal list re-sorted client-side");
            }
        }
    }

    /// A scroll-proximity signal from presentation: a detail-free "the
    /// boundary is visible" event. Appends the next page only in search
    /// mode, only when loaded, and only when the remote reported more.
    pub async fn note_scroll_near_end(&self) {
        let eligible = {
            let shared = self.shared.read().await;
            shared.mode == BrowseMode::Search && matches!(shared.state, BrowseState::Loaded(_))
        };
        if !eligible || !self.paginator.has_more().await {
            return;
        }

        match self.paginator.append_next().await {
            Ok(_) => {}
            Err(e) => {
                let mut shared = self.shared.write().await;
                if let BrowseState::Loaded(descriptor) = shared.state.clone() {
                    shared.state = BrowseState::Error {
                        descriptor,
                        message: e.to_string(),
                    };
                }
            }
        }
    }

    /// Toggle into personal-list mode and run the full paged fetch. While
    /// the list is open the live-search debounce is suppressed.
    pub async fn enter_personal_list(&self) {
        let epoch = self.list_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut shared = self.shared.write().await;
            shared.mode = BrowseMode::PersonalList;
            shared.state = BrowseState::Loading(shared.last_search.clone());
        }

        let outcome = async {
            let info = self.backend.auth_info().await?;
            self.reconciler.full_list(&info.id).await
        }
        .await;

        if self.list_epoch.load(Ordering::SeqCst) != epoch {
            debug!(op = "enter_personal_list", "late list fetch discarded");
            return;
        }

        let mut shared = self.shared.write().await;
        if shared.mode != BrowseMode::PersonalList {
            return;
        }
        match outcome {
            Ok(rows) => {
                shared.statuses = rows
                    .iter()
                    .filter_map(|row| row.status.map(|s| (row.record.id.clone(), s)))
                    .collect();
                shared.list_rows = rows;
                shared.state = BrowseState::Loaded(shared.last_search.clone());
            }
            Err(e) => {
                if e.is_auth() {
                    shared.auth_expired = true;
                }
                shared.state = BrowseState::Error {
                    descriptor: shared.last_search.clone(),
                    message: e.to_string(),
                };
            }
        }
    }

    /// Return to search mode: restore the last search descriptor, clear
    /// display-only list annotations, and re-run the restored query.
    pub async fn return_to_search(&self) {
        // Invalidate any in-flight list fetch.
        self.list_epoch.fetch_add(1, Ordering::SeqCst);
        let descriptor = {
            let mut shared = self.shared.write().await;
            shared.mode = BrowseMode::Search;
            shared.statuses = HashMap::new();
            shared.list_rows = Vec::new();
            shared.last_search.clone()
        };
        self.submit(descriptor).await;
    }

    /// Refresh the membership set used to badge search results.
    ///
    /// This is an independent read from the full-list fetch; the two can
    /// observe different remote snapshots. Failure only costs badges.
    pub async fn refresh_membership(&self) {
        let outcome = async {
            let info = self.backend.auth_info().await?;
            self.reconciler.membership_set(&info.id).await
        }
        .await;

        match outcome {
            Ok(set) => {
                self.shared.write().await.membership = Some(set);
            }
            Err(e) => {
                if e.is_auth() {
                    self.shared.write().await.auth_expired = true;
                }
                debug!(error = %e, "membership refresh failed");
            }
        }
    }

    /// Make `status` the entry's only status label, then update the local
    /// annotations (whole-value replacement).
    pub async fn assign_status(&self, id: &EntityId, status: Status) -> Result<()> {
        self.backend.assign_status(id, status).await?;

        let mut shared = self.shared.write().await;
        let mut statuses = shared.statuses.clone();
        statuses.insert(id.clone(), status);
        shared.statuses = statuses;

        if let Some(set) = &shared.membership {
            let mut set = set.clone();
            set.insert(id.clone());
            shared.membership = Some(set);
        }

        let mut rows = shared.list_rows.clone();
        for row in rows.iter_mut().filter(|row| &row.record.id == id) {
            row.status = Some(status);
        }
        shared.list_rows = rows;
        Ok(())
    }

    /// Remove an entry from the personal list and from the local
    /// annotations.
    pub async fn remove_from_list(&self, id: &EntityId) -> Result<()> {
        self.backend.remove_entry(id).await?;

        let mut shared = self.shared.write().await;
        let mut statuses = shared.statuses.clone();
        statuses.remove(id);
        shared.statuses = statuses;

        if let Some(set) = &shared.membership {
            let mut set = set.clone();
            set.remove(id);
            shared.membership = Some(set);
        }

        shared.list_rows = shared
            .list_rows
            .iter()
            .filter(|row| &row.record.id != id)
            .cloned()
            .collect();
        Ok(())
    }

    /// The combined view model: state, mode, annotated search results, and
    /// client-side-sorted personal-list rows.
    pub async fn snapshot(&self) -> BrowseSnapshot {
        let entries = self.paginator.entries().await;
        let shared = self.shared.read().await;

        let results = entries
            .into_iter()
            .map(|entry| {
                let in_list = shared
                    .membership
                    .as_ref()
                    .map(|set| set.contains(&entry.id));
                let status = shared.statuses.get(&entry.id).copied();
                AnnotatedEntry {
                    entry,
                    in_list,
                    status,
                }
            })
            .collect();

        let mut list_rows = shared.list_rows.clone();
        sort_rows(&mut list_rows, shared.list_sort);

        BrowseSnapshot {
            mode: shared.mode,
            state: shared.state.clone(),
            results,
            list_rows,
            active_tag: shared.active_tag.clone(),
            auth_expired: shared.auth_expired,
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> BrowseState {
        self.shared.read().await.state.clone()
    }

    /// Current mode.
    pub async fn mode(&self) -> BrowseMode {
        self.shared.read().await.mode
    }

    /// Issue a replace for a new descriptor and commit the resulting state
    /// transition unless the flow was superseded meanwhile.
    async fn submit(&self, descriptor: QueryDescriptor) {
        {
            let mut shared = self.shared.write().await;
            shared.state = BrowseState::Loading(descriptor.clone());
            shared.last_search = descriptor.clone();
        }

        match self.paginator.replace(descriptor.clone()).await {
            Ok(FetchOutcome::Committed(count)) => {
                let mut shared = self.shared.write().await;
                if shared.last_search == descriptor {
                    shared.state = BrowseState::Loaded(descriptor);
                    debug!(op = "submit", result_count = count, "query loaded");
                }
            }
            Ok(FetchOutcome::Superseded) | Ok(FetchOutcome::Skipped) => {}
            Err(e) => {
                let mut shared = self.shared.write().await;
                if shared.last_search == descriptor {
                    warn!(error = %e, "query failed");
                    shared.state = BrowseState::Error {
                        descriptor,
                        message: e.to_string(),
                    };
                }
            }
        }
    }
}

/// Client-side ordering for personal-list rows. `Default` keeps fetch
/// order. Rows without a value for the chosen field sort last in either
/// direction.
fn sort_rows(rows: &mut [ListRow], sort: SortState) {
    let descending = sort.direction == SortDirection::Desc;
    match sort.field {
        SortField::Default => {}
        SortField::Title => rows.sort_by(|a, b| {
            let ordering = a
                .record
                .entry
                .title
                .to_lowercase()
                .cmp(&b.record.entry.title.to_lowercase());
            flip(ordering, descending)
        }),
        SortField::Released => rows.sort_by(|a, b| {
            option_cmp(&a.record.entry.released, &b.record.entry.released, descending)
        }),
        SortField::Rating => rows.sort_by(|a, b| {
            option_cmp_f64(a.record.entry.rating, b.record.entry.rating, descending)
        }),
        SortField::VoteCount => rows.sort_by(|a, b| {
            option_cmp(&a.record.entry.vote_count, &b.record.entry.vote_count, descending)
        }),
        SortField::Id => rows.sort_by(|a, b| {
            option_cmp(&a.record.id.numeric(), &b.record.id.numeric(), descending)
        }),
    }
}

fn flip(ordering: CmpOrdering, descending: bool) -> CmpOrdering {
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn option_cmp<T: Ord>(a: &Option<T>, b: &Option<T>, descending: bool) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => flip(a.cmp(b), descending),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

fn option_cmp_f64(a: Option<f64>, b: Option<f64>, descending: bool) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => flip(a.partial_cmp(&b).unwrap_or(CmpOrdering::Equal), descending),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}
