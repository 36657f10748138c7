//! Query descriptors.
//!
//! A [`QueryDescriptor`] is an immutable value describing the current search
//! intent: what kind of query (free text, tag, developer), the term or
//! target identifier, content filters, and sort. A new descriptor is
//! produced on every query change; descriptors are never mutated in place,
//! so an in-flight request always refers to exactly the intent it was
//! started with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::EntityId;

/// What drives the primary filter clause of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Free-text search over titles.
    Text,
    /// All titles carrying one tag.
    Tag,
    /// All titles by one developer.
    Developer,
}

/// Content filters applied on top of the primary clause.
///
/// Languages are kept in a `BTreeSet` so iteration order (and therefore
/// the built expression tree and the request fingerprint) is deterministic
/// regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    /// Available-language codes; empty means no language constraint.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub languages: BTreeSet<String>,

    /// Original-language code, if constrained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,

    /// Only titles with at least one screenshot.
    #[serde(default)]
    pub only_with_screenshots: bool,

    /// Only titles with a description.
    #[serde(default)]
    pub only_with_description: bool,
}

impl FilterState {
    /// Create an unconstrained filter state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an available-language constraint.
    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.languages.insert(code.into());
        self
    }

    /// Set the original-language constraint.
    pub fn with_original_language(mut self, code: impl Into<String>) -> Self {
        self.original_language = Some(code.into());
        self
    }

    /// Require at least one screenshot.
    pub fn with_screenshots_only(mut self, on: bool) -> Self {
        self.only_with_screenshots = on;
        self
    }

    /// Require a description.
    pub fn with_description_only(mut self, on: bool) -> Self {
        self.only_with_description = on;
        self
    }

    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
            && self.original_language.is_none()
            && !self.only_with_screenshots
            && !self.only_with_description
    }
}

/// Server-side sortable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Remote default ordering (relevance for text queries).
    #[default]
    Default,
    Title,
    Released,
    Rating,
    VoteCount,
    Id,
}

impl SortField {
    /// Wire name of the sort field; `None` for the remote default, which
    /// must be expressed by omitting the sort key entirely.
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            SortField::Default => None,
            SortField::Title => Some("title"),
            SortField::Released => Some("released"),
            SortField::Rating => Some("rating"),
            SortField::VoteCount => Some("votecount"),
            SortField::Id => Some("id"),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort state carried by a descriptor.
///
/// Invariant: `field = Default` ignores `direction` for protocol purposes,
/// but the direction is still preserved so a later field change picks it
/// back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::Default,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Replace the field, preserving direction.
    pub fn with_field(self, field: SortField) -> Self {
        Self { field, ..self }
    }

    /// Replace the direction, preserving field.
    pub fn with_direction(self, direction: SortDirection) -> Self {
        Self { direction, ..self }
    }

    /// Whether the wire request carries `reverse: true`.
    ///
    /// Only meaningful when [`SortField::wire_name`] is `Some`.
    pub fn reverse(self) -> bool {
        matches!(self.direction, SortDirection::Desc)
    }
}

/// Immutable description of one search intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub kind: QueryKind,
    /// Free-text term; meaningful for `kind = Text`, may be empty.
    pub term: String,
    /// Target tag for `kind = Tag`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<EntityId>,
    /// Target developer for `kind = Developer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<EntityId>,
    pub filters: FilterState,
    pub sort: SortState,
}

impl QueryDescriptor {
    /// Descriptor for a free-text query.
    pub fn text(term: impl Into<String>) -> Self {
        Self {
            kind: QueryKind::Text,
            term: term.into(),
            tag_id: None,
            developer_id: None,
            filters: FilterState::default(),
            sort: SortState::default(),
        }
    }

    /// Descriptor for a tag query.
    pub fn tag(tag_id: EntityId) -> Self {
        Self {
            kind: QueryKind::Tag,
            term: String::new(),
            tag_id: Some(tag_id),
            developer_id: None,
            filters: FilterState::default(),
            sort: SortState::default(),
        }
    }

    /// Descriptor for a developer query.
    pub fn developer(developer_id: EntityId) -> Self {
        Self {
            kind: QueryKind::Developer,
            term: String::new(),
            tag_id: None,
            developer_id: Some(developer_id),
            filters: FilterState::default(),
            sort: SortState::default(),
        }
    }

    /// Replace the filter state.
    pub fn with_filters(mut self, filters: FilterState) -> Self {
        self.filters = filters;
        self
    }

    /// Replace the sort state.
    pub fn with_sort(mut self, sort: SortState) -> Self {
        self.sort = sort;
        self
    }
}

impl Default for QueryDescriptor {
    /// The descriptor active before any user input: an empty text query,
    /// which the filter builder turns into a cheap default slice.
    fn default() -> Self {
        QueryDescriptor::text("")
    }
}

/// One page worth of a descriptor: what the gateway actually executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleQuery {
    pub descriptor: QueryDescriptor,
    /// 1-based page number.
    pub page: u32,
}

impl TitleQuery {
    pub fn first_page(descriptor: QueryDescriptor) -> Self {
        Self { descriptor, page: 1 }
    }
}
