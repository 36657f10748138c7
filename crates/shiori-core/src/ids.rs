//! Canonical entity identifiers.
//!
//! The remote catalog is inconsistent about identifier shape: the same
//! record can arrive as `17`, `"17"`, or `"v17"` depending on the endpoint
//! and field. Everything downstream joins records by identifier, so every
//! identifier is normalized into one canonical form at the decode boundary:
//! lowercase, always carrying its namespace prefix (`"v17"`).
//!
//! Raw identifiers are never compared directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity namespaces known to the remote catalog.
///
/// The single-character prefix is part of the canonical identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Catalog title (`v`)
    Title,
    /// Release of a title (`r`)
    Release,
    /// Producer / developer (`p`)
    Producer,
    /// Character (`c`)
    Character,
    /// Character trait (`i`)
    Trait,
    /// Content tag (`g`)
    Tag,
    /// User account (`u`)
    User,
}

impl EntityKind {
    /// Namespace prefix carried by canonical identifiers of this kind.
    pub fn prefix(self) -> char {
        match self {
            EntityKind::Title => 'v',
            EntityKind::Release => 'r',
            EntityKind::Producer => 'p',
            EntityKind::Character => 'c',
            EntityKind::Trait => 'i',
            EntityKind::Tag => 'g',
            EntityKind::User => 'u',
        }
    }
}

/// A canonical entity identifier: lowercase, prefixed, stable.
///
/// Invariant: any two identifiers referring to the same remote record
/// normalize to the same `EntityId`, regardless of the numeric, string, or
/// prefixed form the remote returned.
///
/// # Example
///
/// ```
/// use shiori_core::ids::{EntityId, EntityKind};
///
/// let a = EntityId::normalize(EntityKind::Title, "V17");
/// let b = EntityId::from_numeric(EntityKind::Title, 17);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "v17");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Normalize a string-form identifier.
    ///
    /// Lowercases, then prefixes with the kind's namespace character unless
    /// the prefix is already present. Idempotent:
    /// `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(kind: EntityKind, raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered.starts_with(kind.prefix()) {
            EntityId(lowered)
        } else {
            EntityId(format!("{}{}", kind.prefix(), lowered))
        }
    }

    /// Normalize a numeric-form identifier.
    pub fn from_numeric(kind: EntityKind, value: u64) -> Self {
        EntityId(format!("{}{}", kind.prefix(), value))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric part of the identifier, when it has one.
    ///
    /// Used for numeric ordering (`"v10"` sorts after `"v2"`).
    pub fn numeric(&self) -> Option<u64> {
        let digits = self.0.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        digits.parse().ok()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
