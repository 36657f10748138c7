//! Structured logging schema and field name constants for shiori.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log tooling can query by standardized field names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded behavior surfaced to the user |
//! | WARN  | Recoverable issue, fallback or bound applied |
//! | INFO  | Lifecycle events, write completions |
//! | DEBUG | Decision points, cache hits/misses, state transitions |
//! | TRACE | Per-row iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "client", "cache", "browse"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "gateway", "response_cache", "paginator", "reconciler"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "search_titles", "lookup_titles", "replace", "append_next"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Canonical entity identifier being operated on.
pub const ENTITY_ID: &str = "entity_id";

/// Search term of the active query.
pub const QUERY_TERM: &str = "term";

/// 1-based page number of a paged fetch.
pub const PAGE: &str = "page";

// ─── Cache fields ──────────────────────────────────────────────────────────

/// Cache key namespace ("title", "list", "tag").
pub const NAMESPACE: &str = "namespace";

/// Whether a read was served from cache.
pub const CACHE_HIT: &str = "cache_hit";

/// Number of entries dropped by an invalidation or expiry sweep.
pub const EVICTED: &str = "evicted";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a fetch.
pub const RESULT_COUNT: &str = "result_count";

/// Whether the remote reports further pages.
pub const HAS_MORE: &str = "has_more";

// ─── Flow fields ───────────────────────────────────────────────────────────

/// Staleness token of an asynchronous flow.
pub const GENERATION: &str = "generation";

/// Index of the request-shape variant that succeeded (0 = preferred).
pub const VARIANT: &str = "variant";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
