//! Scripted catalog backend for deterministic testing.
//!
//! Every operation is scripted ahead of time and logged for assertion.
//! Search responses can carry a delay so tests can stage the
//! late-response race under `tokio`'s paused clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use shiori_core::{
    AuthInfo, CatalogBackend, CatalogEntry, EntityId, EntityKind, Error, ListRecord, ListView,
    Page, QueryDescriptor, QueryKind, Result, Status, TagInfo, TitleQuery,
};

/// A scripted search response: an optional delay, then a page or an error.
struct ScriptedPage {
    delay_ms: u64,
    result: std::result::Result<Page<CatalogEntry>, String>,
}

/// In-memory catalog backend driven entirely by scripted responses.
#[derive(Default)]
pub struct MockCatalog {
    search_script: Mutex<HashMap<(String, u32), ScriptedPage>>,
    list_script: Mutex<HashMap<(ListView, u32), Page<ListRecord>>>,
    lookup_pool: Mutex<HashMap<EntityId, CatalogEntry>>,
    tags: Mutex<HashMap<EntityId, TagInfo>>,
    fail_tags: AtomicBool,
    auth: Mutex<Option<AuthInfo>>,

    search_calls: Mutex<Vec<TitleQuery>>,
    lookup_calls: Mutex<Vec<Vec<EntityId>>>,
    list_calls: Mutex<Vec<(u32, ListView)>>,
    write_log: Mutex<Vec<String>>,
}

/// A descriptor collapses to the key its scripted responses are filed
/// under: the term for text queries, the target id otherwise.
fn descriptor_key(descriptor: &QueryDescriptor) -> String {
    match descriptor.kind {
        QueryKind::Text => format!("text:{}", descriptor.term),
        QueryKind::Tag => format!(
            "tag:{}",
            descriptor.tag_id.as_ref().map(EntityId::as_str).unwrap_or("")
        ),
        QueryKind::Developer => format!(
            "dev:{}",
            descriptor
                .developer_id
                .as_ref()
                .map(EntityId::as_str)
                .unwrap_or("")
        ),
    }
}

/// Shorthand for a minimal catalog entry.
pub fn entry(id: &str, title: &str) -> CatalogEntry {
    CatalogEntry {
        id: EntityId::normalize(EntityKind::Title, id),
        title: title.to_string(),
        rating: None,
        vote_count: None,
        released: None,
        cover: None,
    }
}

/// Shorthand for a list record with the given labels.
pub fn list_record(id: &str, title: &str, labels: &[u32]) -> ListRecord {
    let entity = EntityId::normalize(EntityKind::Title, id);
    let row_entry = if title.is_empty() {
        CatalogEntry::placeholder(entity.clone())
    } else {
        entry(id, title)
    };
    ListRecord {
        id: entity,
        labels: labels.to_vec(),
        entry: row_entry,
    }
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one search page for a descriptor.
    pub fn script_search(
        &self,
        descriptor: &QueryDescriptor,
        page: u32,
        results: Vec<CatalogEntry>,
        more: bool,
    ) {
        self.script_search_delayed(descriptor, page, 0, results, more);
    }

    /// Script one search page that resolves after `delay_ms`.
    pub fn script_search_delayed(
        &self,
        descriptor: &QueryDescriptor,
        page: u32,
        delay_ms: u64,
        results: Vec<CatalogEntry>,
        more: bool,
    ) {
        self.search_script.lock().unwrap().insert(
            (descriptor_key(descriptor), page),
            ScriptedPage {
                delay_ms,
                result: Ok(Page { results, more }),
            },
        );
    }

    /// Script a search page that fails.
    pub fn script_search_failure(&self, descriptor: &QueryDescriptor, page: u32, message: &str) {
        self.search_script.lock().unwrap().insert(
            (descriptor_key(descriptor), page),
            ScriptedPage {
                delay_ms: 0,
                result: Err(message.to_string()),
            },
        );
    }

    /// Script one personal-list page for a projection.
    pub fn script_list_page(
        &self,
        view: ListView,
        page: u32,
        results: Vec<ListRecord>,
        more: bool,
    ) {
        self.list_script
            .lock()
            .unwrap()
            .insert((view, page), Page { results, more });
    }

    /// Make an entry available to batch lookups.
    pub fn add_lookup_entry(&self, entry: CatalogEntry) {
        self.lookup_pool.lock().unwrap().insert(entry.id.clone(), entry);
    }

    /// Register tag metadata.
    pub fn add_tag(&self, tag: TagInfo) {
        self.tags.lock().unwrap().insert(tag.id.clone(), tag);
    }

    /// Make every tag fetch fail, for best-effort degradation tests.
    pub fn fail_tag_fetches(&self) {
        self.fail_tags.store(true, Ordering::SeqCst);
    }

    /// Configure the authenticated user; `None` makes `auth_info` fail.
    pub fn set_auth(&self, auth: Option<AuthInfo>) {
        *self.auth.lock().unwrap() = auth;
    }

    pub fn search_calls(&self) -> Vec<TitleQuery> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn lookup_calls(&self) -> Vec<Vec<EntityId>> {
        self.lookup_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<(u32, ListView)> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn write_log(&self) -> Vec<String> {
        self.write_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogBackend for MockCatalog {
    async fn search_titles(&self, query: &TitleQuery) -> Result<Page<CatalogEntry>> {
        self.search_calls.lock().unwrap().push(query.clone());

        let scripted = {
            let script = self.search_script.lock().unwrap();
            match script.get(&(descriptor_key(&query.descriptor), query.page)) {
                Some(page) => (page.delay_ms, page.result.clone()),
                None => (0, Ok(Page::empty())),
            }
        };

        let (delay_ms, result) = scripted;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        result.map_err(Error::Transport)
    }

    async fn lookup_titles(&self, ids: &[EntityId]) -> Result<Vec<CatalogEntry>> {
        self.lookup_calls.lock().unwrap().push(ids.to_vec());
        let pool = self.lookup_pool.lock().unwrap();
        Ok(ids.iter().filter_map(|id| pool.get(id).cloned()).collect())
    }

    async fn fetch_tag(&self, id: &EntityId) -> Result<Option<TagInfo>> {
        if self.fail_tags.load(Ordering::SeqCst) {
            return Err(Error::Transport("tag service unavailable".to_string()));
        }
        Ok(self.tags.lock().unwrap().get(id).cloned())
    }

    async fn auth_info(&self) -> Result<AuthInfo> {
        self.auth
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Auth("no credential configured".to_string()))
    }

    async fn list_page(
        &self,
        _user: &EntityId,
        page: u32,
        view: ListView,
    ) -> Result<Page<ListRecord>> {
        self.list_calls.lock().unwrap().push((page, view));
        let script = self.list_script.lock().unwrap();
        Ok(script.get(&(view, page)).cloned().unwrap_or_else(Page::empty))
    }

    async fn set_labels(&self, id: &EntityId, labels: &[u32]) -> Result<()> {
        self.write_log
            .lock()
            .unwrap()
            .push(format!("set_labels {} {:?}", id, labels));
        Ok(())
    }

    async fn assign_status(&self, id: &EntityId, status: Status) -> Result<()> {
        self.write_log
            .lock()
            .unwrap()
            .push(format!("assign_status {} {}", id, status));
        Ok(())
    }

    async fn remove_entry(&self, id: &EntityId) -> Result<()> {
        self.write_log
            .lock()
            .unwrap()
            .push(format!("remove_entry {}", id));
        Ok(())
    }
}
