//! Keyword normalization: decoded library JSON -> [`KeywordRecord`]s.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use rfdocs_shared::{KeywordMap, KeywordRecord, ParseError};

use crate::cleanup::plain_doc;
use crate::embedded_json::extract_embedded_json;

// ---------------------------------------------------------------------------
// Input model (the embedded library JSON)
// ---------------------------------------------------------------------------

/// The part of the embedded library JSON that is indexed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDoc {
    /// Keyword entries in source order.
    #[serde(default)]
    pub keywords: Option<Vec<RawKeyword>>,
}

/// One raw keyword entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawKeyword {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<RawArgument>>,
    #[serde(default)]
    pub shortdoc: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Usually a number; strings of digits are accepted too.
    #[serde(default)]
    pub lineno: Option<serde_json::Value>,
}

/// One raw argument entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArgument {
    /// Human-readable signature, e.g. `*args` or `level=INFO`.
    #[serde(default)]
    pub repr: Option<String>,
}

impl LibraryDoc {
    /// Decode from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        serde_json::from_value(value).map_err(|e| ParseError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Normalized keywords of one library.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryKeywords {
    /// Owning library.
    pub library: String,
    /// Records keyed by keyword name.
    pub keywords: KeywordMap,
    /// Number of records in `keywords`.
    pub total_keywords: usize,
}

/// Normalize decoded library JSON into keyword records.
///
/// Entries without a name are skipped; a later entry with the same name
/// replaces an earlier one.
pub fn normalize_keywords(doc: LibraryDoc, library: &str) -> LibraryKeywords {
    let mut keywords = KeywordMap::new();

    for raw in doc.keywords.unwrap_or_default() {
        let name = match raw.name {
            Some(name) if !name.is_empty() => name,
            _ => continue,
        };

        let args = raw
            .args
            .unwrap_or_default()
            .into_iter()
            .filter_map(|arg| arg.repr)
            .filter(|repr| !repr.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let record = KeywordRecord {
            id: name.replace(' ', "%20"),
            args,
            doc: plain_doc(raw.shortdoc.as_deref().unwrap_or_default()),
            library: library.to_string(),
            source: raw.source.unwrap_or_default(),
            lineno: raw.lineno.as_ref().and_then(lineno),
            name: name.clone(),
        };

        keywords.insert(name, record);
    }

    LibraryKeywords {
        library: library.to_string(),
        total_keywords: keywords.len(),
        keywords,
    }
}

/// Extract, decode and normalize the keywords embedded in a library document.
#[instrument(skip(html, anchor), fields(html_len = html.len()))]
pub fn parse_library_document(
    html: &str,
    anchor: &Regex,
    library: &str,
) -> Result<LibraryKeywords, ParseError> {
    let doc: LibraryDoc = extract_embedded_json(html, anchor)?;
    let parsed = normalize_keywords(doc, library);
    debug!(keywords = parsed.total_keywords, "library keywords normalized");
    Ok(parsed)
}

fn lineno(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
