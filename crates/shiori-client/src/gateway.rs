//! HTTP gateway to the remote catalog.
//!
//! All reads go through the [`ResponseCache`]; all writes invalidate the
//! personal-list namespace. Request shapes that the remote may reject are
//! expressed as an explicit ordered variant list with a fixed attempt cap:
//! the preferred shape first, the maximally-compatible shape second, and
//! nothing after that.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value as JsonValue};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use shiori_core::{
    build_filters, defaults, id_batch, AuthInfoRecord, CatalogBackend, CatalogEntry, EntityId,
    Error, ListEntryRecord, ListRecord, ListView, Page, Result, Status, TagInfo, TagRecord,
    TitleQuery, TitleRecord,
};

use crate::cache::{ResponseCache, NS_LIST, NS_TAG, NS_TITLE};
use crate::config::CatalogConfig;

/// Field paths requested for catalog title reads.
const TITLE_FIELDS: &str =
    "id,title,rating,votecount,released,image.url,image.thumbnail,image.sexual";

/// Field paths for the identifier-only personal-list projection.
const MEMBERSHIP_FIELDS: &str = "id";

/// Field paths for the full personal-list projection.
const LIST_FIELDS: &str = "id,labels.id,title.title,title.rating,title.votecount,\
title.released,title.image.url,title.image.thumbnail,title.image.sexual";

/// Field paths for tag metadata reads.
const TAG_FIELDS: &str = "id,name,category";

/// Gateway to the remote catalog API.
pub struct CatalogGateway {
    client: Client,
    config: CatalogConfig,
    credential: RwLock<Option<String>>,
    cache: ResponseCache,
}

impl CatalogGateway {
    /// Create a gateway with a fresh cache.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        Self::with_cache(config, ResponseCache::new())
    }

    /// Create a gateway sharing an existing cache (tests inject a cache
    /// with a manual clock here).
    pub fn with_cache(config: CatalogConfig, cache: ResponseCache) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("empty base URL".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(base_url = %config.base_url, "initializing catalog gateway");

        let credential = RwLock::new(config.token.clone());
        Ok(Self {
            client,
            config,
            credential,
            cache,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(CatalogConfig::from_env())
    }

    /// The response cache behind this gateway.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Whether a bearer credential is currently held.
    pub async fn has_credential(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// Install a bearer credential.
    pub async fn set_credential(&self, token: impl Into<String>) {
        *self.credential.write().await = Some(token.into());
    }

    /// Drop the bearer credential; subsequent operations run
    /// unauthenticated.
    pub async fn clear_credential(&self) {
        *self.credential.write().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn bearer(&self) -> Option<String> {
        self.credential.read().await.clone()
    }

    /// Map a response to its decoded JSON body or the error taxonomy.
    /// An invalid credential also drops the stored one, so later calls
    /// run unauthenticated instead of failing the same way.
    async fn decode_response(&self, response: reqwest::Response) -> Result<JsonValue> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            if text.is_empty() {
                return Ok(JsonValue::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "credential rejected, dropping it");
            self.clear_credential().await;
            return Err(Error::Auth(format!("remote returned {}", status.as_u16())));
        }

        if status.is_client_error() {
            return Err(Error::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }

        Err(Error::Transport(format!(
            "remote returned {}: {}",
            status.as_u16(),
            text
        )))
    }

    async fn execute_post(&self, path: &str, body: &JsonValue) -> Result<JsonValue> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = self.bearer().await {
            request = request.bearer_auth(token);
        }
        self.decode_response(request.send().await?).await
    }

    /// POST read through the cache.
    async fn cached_post(&self, namespace: &str, path: &str, body: &JsonValue) -> Result<JsonValue> {
        let key = ResponseCache::fingerprint(namespace, body);
        if let Some(payload) = self.cache.get(&key).await {
            debug!(namespace, op = "read", cache_hit = true, "served from cache");
            return Ok(payload);
        }

        let payload = self.execute_post(path, body).await?;
        self.cache.put(key, payload.clone()).await;
        Ok(payload)
    }

    /// PATCH with an ordered list of request-shape variants. Tries each in
    /// sequence; a rejected shape falls through to the next, anything else
    /// surfaces immediately. The variant list is the attempt cap.
    async fn patch_with_variants(&self, path: &str, variants: &[JsonValue]) -> Result<()> {
        let mut last_rejection = None;
        for (index, body) in variants.iter().enumerate() {
            let mut request = self.client.patch(self.url(path)).json(body);
            if let Some(token) = self.bearer().await {
                request = request.bearer_auth(token);
            }
            match self.decode_response(request.send().await?).await {
                Ok(_) => {
                    if index > 0 {
                        warn!(variant = index, "write accepted by compatibility shape");
                    }
                    return Ok(());
                }
                Err(e) if e.is_rejected() && index + 1 < variants.len() => {
                    warn!(
                        variant = index,
                        error = %e,
                        "request shape rejected, retrying with compatible shape"
                    );
                    last_rejection = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_rejection
            .unwrap_or_else(|| Error::Internal("empty variant list".to_string())))
    }

    async fn execute_delete(&self, path: &str) -> Result<()> {
        let mut request = self.client.delete(self.url(path));
        if let Some(token) = self.bearer().await {
            request = request.bearer_auth(token);
        }
        self.decode_response(request.send().await?).await?;
        Ok(())
    }

    /// Every personal-list write drops the whole list namespace; partial
    /// invalidation is not attempted because a label change can affect
    /// multiple cached page windows.
    async fn invalidate_list_cache(&self) {
        let evicted = self.cache.invalidate_namespace(NS_LIST).await;
        debug!(evicted, "personal-list cache invalidated after write");
    }
}

#[async_trait]
impl CatalogBackend for CatalogGateway {
    async fn search_titles(&self, query: &TitleQuery) -> Result<Page<CatalogEntry>> {
        let mut body = json!({
            "filters": build_filters(&query.descriptor).to_value(),
            "fields": TITLE_FIELDS,
            "results": self.config.page_size,
            "page": query.page,
        });
        if let Some(field) = query.descriptor.sort.field.wire_name() {
            body["sort"] = json!(field);
            body["reverse"] = json!(query.descriptor.sort.reverse());
        }

        let payload = self.cached_post(NS_TITLE, "/title", &body).await?;
        let page: Page<TitleRecord> = serde_json::from_value(payload)?;
        let page = page.map(TitleRecord::decode);
        debug!(
            op = "search_titles",
            page = query.page,
            result_count = page.results.len(),
            has_more = page.more,
            "search page fetched"
        );
        Ok(page)
    }

    async fn lookup_titles(&self, ids: &[EntityId]) -> Result<Vec<CatalogEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > defaults::HYDRATION_CHUNK_SIZE {
            return Err(Error::InvalidInput(format!(
                "batch lookup limited to {} ids, got {}",
                defaults::HYDRATION_CHUNK_SIZE,
                ids.len()
            )));
        }

        let body = json!({
            "filters": id_batch(ids).to_value(),
            "fields": TITLE_FIELDS,
            "results": defaults::HYDRATION_CHUNK_SIZE,
        });

        let payload = self.cached_post(NS_TITLE, "/title", &body).await?;
        let page: Page<TitleRecord> = serde_json::from_value(payload)?;
        debug!(
            op = "lookup_titles",
            requested = ids.len(),
            result_count = page.results.len(),
            "batch lookup"
        );
        Ok(page.results.into_iter().map(TitleRecord::decode).collect())
    }

    async fn fetch_tag(&self, id: &EntityId) -> Result<Option<TagInfo>> {
        let body = json!({
            "filters": ["id", "=", id.as_str()],
            "fields": TAG_FIELDS,
            "results": 1,
        });

        let payload = self.cached_post(NS_TAG, "/tag", &body).await?;
        let page: Page<TagRecord> = serde_json::from_value(payload)?;
        Ok(page.results.into_iter().next().map(TagRecord::decode))
    }

    async fn auth_info(&self) -> Result<shiori_core::AuthInfo> {
        let token = self
            .bearer()
            .await
            .ok_or_else(|| Error::Auth("no credential configured".to_string()))?;

        let request = self.client.get(self.url("/authinfo")).bearer_auth(token);
        let payload = self.decode_response(request.send().await?).await?;
        let record: AuthInfoRecord = serde_json::from_value(payload)?;
        Ok(record.decode())
    }

    async fn list_page(
        &self,
        user: &EntityId,
        page: u32,
        view: ListView,
    ) -> Result<Page<ListRecord>> {
        let fields = match view {
            ListView::Membership => MEMBERSHIP_FIELDS,
            ListView::Full => LIST_FIELDS,
        };
        let body = json!({
            "user": user.as_str(),
            "fields": fields,
            "results": defaults::LIST_PAGE_SIZE,
            "page": page,
        });

        let payload = self.cached_post(NS_LIST, "/personal-list", &body).await?;
        let decoded: Page<ListEntryRecord> = serde_json::from_value(payload)?;
        let decoded = decoded.map(ListEntryRecord::decode);
        debug!(
            op = "list_page",
            page,
            result_count = decoded.results.len(),
            has_more = decoded.more,
            "personal-list page fetched"
        );
        Ok(decoded)
    }

    async fn set_labels(&self, id: &EntityId, labels: &[u32]) -> Result<()> {
        let path = format!("/personal-list/{}", id);
        let variants = [json!({ "labels_set": labels }), json!({ "labels": labels })];
        self.patch_with_variants(&path, &variants).await?;
        info!(entity_id = %id, op = "set_labels", "personal-list entry updated");
        self.invalidate_list_cache().await;
        Ok(())
    }

    async fn assign_status(&self, id: &EntityId, status: Status) -> Result<()> {
        let path = format!("/personal-list/{}", id);
        let variants = [
            json!({
                "labels_unset": status.others(),
                "labels_set": [status.label_id()],
            }),
            json!({ "labels": [status.label_id()] }),
        ];
        self.patch_with_variants(&path, &variants).await?;
        info!(entity_id = %id, status = %status, op = "assign_status", "status assigned");
        self.invalidate_list_cache().await;
        Ok(())
    }

    async fn remove_entry(&self, id: &EntityId) -> Result<()> {
        let path = format!("/personal-list/{}", id);
        self.execute_delete(&path).await?;
        info!(entity_id = %id, op = "remove_entry", "personal-list entry removed");
        self.invalidate_list_cache().await;
        Ok(())
    }
}
