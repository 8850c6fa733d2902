//! Persisted data model: sections, keyword records and the two indexes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for both persisted index formats.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One heading-delimited unit of the user guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Anchor identifier taken from the heading's `id` attribute (may be empty).
    pub id: String,
    /// Heading depth, 1 to 4.
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Non-heading text up to the next heading, whitespace-joined.
    pub content: String,
}

/// The `docs_index_<version>.json` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionIndex {
    /// Documentation version the sections were parsed from.
    pub version: String,
    /// Artifact layout version.
    #[serde(default)]
    pub schema_version: u32,
    /// When the user guide was parsed.
    pub parsed_at: DateTime<Utc>,
    /// Number of entries in `sections`.
    pub total_sections: usize,
    /// Sections in document order.
    pub sections: Vec<Section>,
}

impl SectionIndex {
    /// Wrap freshly extracted sections, stamped with the current time.
    pub fn new(version: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            version: version.into(),
            schema_version: CURRENT_SCHEMA_VERSION,
            parsed_at: Utc::now(),
            total_sections: sections.len(),
            sections,
        }
    }
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// One callable keyword of one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRecord {
    /// Canonical display name.
    pub name: String,
    /// URL fragment for deep links (`name` with spaces as `%20`).
    pub id: String,
    /// Comma-joined argument signatures.
    pub args: String,
    /// Short description, plain text.
    pub doc: String,
    /// Owning library.
    pub library: String,
    /// Source file of the implementation, if known.
    #[serde(default)]
    pub source: String,
    /// Line number in `source`, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u64>,
}

/// Keyword records of one library, keyed (and ordered) by name.
pub type KeywordMap = BTreeMap<String, KeywordRecord>;

/// The `all_keywords_<version>.json` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordIndex {
    /// Documentation version the keywords were parsed from.
    pub version: String,
    /// Artifact layout version.
    #[serde(default)]
    pub schema_version: u32,
    /// When the libraries were parsed.
    pub parsed_at: DateTime<Utc>,
    /// Number of libraries in `libraries`.
    pub total_libraries: usize,
    /// Sum of keywords across all libraries.
    pub total_keywords: usize,
    /// Library name -> keyword name -> record.
    pub libraries: BTreeMap<String, KeywordMap>,
}

impl KeywordIndex {
    /// Build an index from per-library keyword maps, computing the totals.
    pub fn new(version: impl Into<String>, libraries: BTreeMap<String, KeywordMap>) -> Self {
        let total_keywords = libraries.values().map(BTreeMap::len).sum();
        Self {
            version: version.into(),
            schema_version: CURRENT_SCHEMA_VERSION,
            parsed_at: Utc::now(),
            total_libraries: libraries.len(),
            total_keywords,
            libraries,
        }
    }
}
