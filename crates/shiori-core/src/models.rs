//! Data models for the shiori browsing core.
//!
//! Two layers live here. The **wire records** (`*Record`, [`RawId`],
//! [`TitleRef`], [`LabelRef`]) mirror the loose shapes the remote actually
//! returns: ids that are numbers or strings, embedded objects that are
//! sometimes bare identifiers, fields that are simply absent. Each wire
//! record has exactly one `decode` path into the **view models**
//! ([`CatalogEntry`], [`ListRecord`], [`AuthInfo`], [`TagInfo`]), which are
//! the closed set of shapes everything downstream consumes. No component
//! past this module branches on "does this field exist."

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{EntityId, EntityKind};

// =============================================================================
// WIRE ENVELOPE
// =============================================================================

/// One page of a remote read.
///
/// Every successful read returns `results` (possibly empty) and a `more`
/// flag; a missing `more` is treated as `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub more: bool,
}

impl<T> Page<T> {
    /// An empty terminal page.
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            more: false,
        }
    }

    /// Map the row type, preserving `more`.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            more: self.more,
        }
    }
}

/// A remote identifier in whichever shape the remote chose to send it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Num(u64),
    Text(String),
}

impl RawId {
    /// Normalize into the canonical identifier form.
    pub fn normalize(&self, kind: EntityKind) -> EntityId {
        match self {
            RawId::Num(n) => EntityId::from_numeric(kind, *n),
            RawId::Text(s) => EntityId::normalize(kind, s),
        }
    }
}

// =============================================================================
// TITLE RECORDS
// =============================================================================

/// Wire shape of a cover image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub sexual: Option<f32>,
}

/// Wire shape of a title row, as returned by catalog reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: RawId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "votecount")]
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRecord>,
}

impl TitleRecord {
    /// Decode into the view model.
    pub fn decode(self) -> CatalogEntry {
        CatalogEntry {
            id: self.id.normalize(EntityKind::Title),
            title: self.title.unwrap_or_default(),
            rating: self.rating,
            vote_count: self.vote_count,
            released: self.released.as_deref().and_then(parse_release_date),
            cover: self.image.map(CoverImage::from),
        }
    }
}

/// Release dates arrive as `"2004-08-26"`, but also as `"TBA"` or a bare
/// year; anything that is not a full date decodes to `None`.
fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Cover image view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverImage {
    pub thumbnail_url: String,
    pub full_url: String,
    /// 0.0 (safe) .. 2.0 (explicit), per the remote's image flagging.
    pub explicitness_score: f32,
}

impl From<ImageRecord> for CoverImage {
    fn from(record: ImageRecord) -> Self {
        CoverImage {
            thumbnail_url: record.thumbnail.unwrap_or_else(|| record.url.clone()),
            full_url: record.url,
            explicitness_score: record.sexual.unwrap_or(0.0),
        }
    }
}

/// View model row for one catalog title.
///
/// `rating` stays `None` when the remote suppressed it for insufficient
/// votes; it is never coerced to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntityId,
    pub title: String,
    pub rating: Option<f64>,
    pub vote_count: Option<u32>,
    pub released: Option<NaiveDate>,
    pub cover: Option<CoverImage>,
}

impl CatalogEntry {
    /// An identifier-only row awaiting hydration.
    pub fn placeholder(id: EntityId) -> Self {
        CatalogEntry {
            id,
            title: String::new(),
            rating: None,
            vote_count: None,
            released: None,
            cover: None,
        }
    }

    /// True when this row has no display data yet.
    pub fn is_placeholder(&self) -> bool {
        self.title.is_empty()
    }
}

// =============================================================================
// PERSONAL-LIST RECORDS
// =============================================================================

/// A label reference on a personal-list entry: a bare id or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelRef {
    Id(u32),
    Tagged {
        id: u32,
        #[serde(default)]
        label: Option<String>,
    },
}

impl LabelRef {
    pub fn id(&self) -> u32 {
        match self {
            LabelRef::Id(id) => *id,
            LabelRef::Tagged { id, .. } => *id,
        }
    }
}

/// The embedded title of a personal-list entry: a full record or a bare
/// identifier, depending on the endpoint's mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TitleRef {
    Embedded(TitleRecord),
    Bare(RawId),
}

/// Wire shape of one personal-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntryRecord {
    pub id: RawId,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    #[serde(default)]
    pub title: Option<TitleRef>,
}

impl ListEntryRecord {
    /// Decode into the view model. Entries whose title is bare or missing
    /// become placeholders, preserved for later hydration.
    pub fn decode(self) -> ListRecord {
        let id = self.id.normalize(EntityKind::Title);
        let entry = match self.title {
            Some(TitleRef::Embedded(record)) => record.decode(),
            Some(TitleRef::Bare(raw)) => {
                CatalogEntry::placeholder(raw.normalize(EntityKind::Title))
            }
            None => CatalogEntry::placeholder(id.clone()),
        };
        ListRecord {
            id,
            labels: self.labels.iter().map(LabelRef::id).collect(),
            entry,
        }
    }
}

/// View model of one personal-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecord {
    pub id: EntityId,
    pub labels: Vec<u32>,
    pub entry: CatalogEntry,
}

impl ListRecord {
    pub fn is_placeholder(&self) -> bool {
        self.entry.is_placeholder()
    }
}

/// Which projection of the personal list a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListView {
    /// Identifiers only; feeds the membership set.
    Membership,
    /// Full display rows (labels, embedded title data where available).
    Full,
}

// =============================================================================
// STATUS LABELS
// =============================================================================

/// The six fixed personal-list labels that map to a mutually-exclusive
/// status. Remote label ids 1..=6, which is also the derivation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Playing,
    Finished,
    Stalled,
    Dropped,
    Wishlist,
    Blacklist,
}

impl Status {
    /// All statuses in ascending label-id (= priority) order.
    pub const ALL: [Status; 6] = [
        Status::Playing,
        Status::Finished,
        Status::Stalled,
        Status::Dropped,
        Status::Wishlist,
        Status::Blacklist,
    ];

    /// Remote label id of this status.
    pub fn label_id(self) -> u32 {
        match self {
            Status::Playing => 1,
            Status::Finished => 2,
            Status::Stalled => 3,
            Status::Dropped => 4,
            Status::Wishlist => 5,
            Status::Blacklist => 6,
        }
    }

    /// Status for a remote label id, if it is one of the six fixed labels.
    pub fn from_label(id: u32) -> Option<Status> {
        Status::ALL.iter().copied().find(|s| s.label_id() == id)
    }

    /// Derive the status of an entry from its label set: scan the six fixed
    /// ids in ascending priority order, first match wins. `None` when no
    /// status label is present.
    pub fn derive(labels: &[u32]) -> Option<Status> {
        Status::ALL
            .iter()
            .copied()
            .find(|s| labels.contains(&s.label_id()))
    }

    /// Display-only default for entries without a status label. Never
    /// persisted as an inferred write.
    pub fn display_default() -> Status {
        Status::Wishlist
    }

    /// Label ids of the other five statuses; the unset half of a
    /// mutually-exclusive status transition.
    pub fn others(self) -> Vec<u32> {
        Status::ALL
            .iter()
            .copied()
            .filter(|s| *s != self)
            .map(Status::label_id)
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Playing => "playing",
            Status::Finished => "finished",
            Status::Stalled => "stalled",
            Status::Dropped => "dropped",
            Status::Wishlist => "wishlist",
            Status::Blacklist => "blacklist",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// AUTH / TAG RECORDS
// =============================================================================

/// Wire shape of the credential introspection response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthInfoRecord {
    pub id: RawId,
    pub username: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AuthInfoRecord {
    pub fn decode(self) -> AuthInfo {
        AuthInfo {
            id: self.id.normalize(EntityKind::User),
            username: self.username,
            permissions: self.permissions,
        }
    }
}

/// Decoded credential introspection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub id: EntityId,
    pub username: String,
    pub permissions: Vec<String>,
}

impl AuthInfo {
    /// Whether the credential may modify the personal list.
    pub fn can_write_list(&self) -> bool {
        self.permissions.iter().any(|p| p == "listwrite")
    }
}

/// Wire shape of a tag metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: RawId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TagRecord {
    pub fn decode(self) -> TagInfo {
        TagInfo {
            id: self.id.normalize(EntityKind::Tag),
            name: self.name.unwrap_or_default(),
            category: self.category,
        }
    }
}

/// Decoded tag metadata, used for display enrichment only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: EntityId,
    pub name: String,
    pub category: Option<String>,
}
