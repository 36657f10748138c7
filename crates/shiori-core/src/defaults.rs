//! Centralized default constants for the shiori browsing core.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// REMOTE ENDPOINT
// =============================================================================

/// Default base URL of the remote catalog API.
pub const BASE_URL: &str = "https://api.shiori.example/v2";

// =============================================================================
// PAGINATION
// =============================================================================

/// Page size for search result fetches.
pub const SEARCH_PAGE_SIZE: u32 = 20;

/// Page size for personal-list fetches (heavier rows, fewer round trips).
pub const LIST_PAGE_SIZE: u32 = 100;

/// Hard bound on membership-set pages, against pathological accounts.
pub const MEMBERSHIP_PAGE_LIMIT: u32 = 40;

/// Maximum identifiers per batch lookup, the remote's practical limit for
/// identifier-set filters.
pub const HYDRATION_CHUNK_SIZE: usize = 100;

// =============================================================================
// CACHING
// =============================================================================

/// TTL for all read caches, in seconds.
pub const CACHE_TTL_SECS: i64 = 300;

// =============================================================================
// BROWSING
// =============================================================================

/// Quiet period before a live-typed term is submitted, in milliseconds.
pub const DEBOUNCE_MS: u64 = 350;

/// Lowest title identifier; anchors the cheap "default slice" filter used
/// when no search term is present.
pub const MIN_TITLE_ID: &str = "v1";

// =============================================================================
// NETWORK
// =============================================================================

/// Default transport timeout in seconds.
pub const TIMEOUT_SECS: u64 = 30;
