//! Read-only queries over the persisted indexes.
//!
//! Every call loads the artifact it needs from disk, so a query always sees
//! one complete index. A missing or stale artifact surfaces as
//! [`RfDocsError::IndexMissing`].

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, instrument};

use rfdocs_shared::{IndexerConfig, KeywordMap, KeywordRecord, Result, RfDocsError, Section};

use crate::store::{load_keyword_index, load_section_index};

/// Library used when a listing names none.
pub const DEFAULT_LIBRARY: &str = "BuiltIn";

const TITLE_WEIGHT: usize = 10;
const CONTENT_WEIGHT: usize = 1;
const PREVIEW_CHARS: usize = 300;
const DESCRIPTION_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub version: String,
    pub query: String,
    /// Matching sections before truncation to `max_results`.
    pub total_matches: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub id: String,
    pub level: u8,
    pub relevance: usize,
    pub content_preview: String,
    pub url: String,
}

/// One entry of a keyword listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordSummary {
    pub name: String,
    pub library: String,
    pub args: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryKeywordList {
    pub version: String,
    pub library: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub total_keywords: usize,
    pub keywords: Vec<KeywordSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllKeywordList {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub total_libraries: usize,
    pub total_keywords: usize,
    pub libraries: BTreeMap<String, Vec<KeywordSummary>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordLookup {
    pub version: String,
    /// Canonical name when found, the searched name otherwise.
    pub keyword: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordAvailability {
    pub version: String,
    pub keyword_searched: String,
    pub available: bool,
    pub library: Option<String>,
    pub keyword_actual_name: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Query layer
// ---------------------------------------------------------------------------

/// Queries bound to one resolved configuration.
#[derive(Debug, Clone)]
pub struct QueryLayer {
    config: IndexerConfig,
}

impl QueryLayer {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    /// Rank sections by weighted, case-insensitive substring counts.
    ///
    /// Title hits count ten times, content hits once. Sections without a
    /// hit are dropped; ties keep document order.
    #[instrument(skip(self))]
    pub fn search_sections(&self, query: &str, max_results: usize) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(RfDocsError::validation("search query must not be empty"));
        }
        // Surrounding whitespace is part of the needle.
        let needle = query.to_lowercase();

        let index = load_section_index(&self.config)?;

        let mut scored: Vec<(usize, &Section)> = index
            .sections
            .iter()
            .map(|section| (relevance(section, &needle), section))
            .filter(|(score, _)| *score > 0)
            .collect();
        // `sort_by` is stable.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let total_matches = scored.len();
        let results = scored
            .into_iter()
            .take(max_results)
            .map(|(relevance, section)| SearchHit {
                title: section.title.clone(),
                id: section.id.clone(),
                level: section.level,
                relevance,
                content_preview: preview(&section.content),
                url: format!("{}#{}", self.config.user_guide_url, section.id),
            })
            .collect();

        debug!(total_matches, "sections searched");
        Ok(SearchResponse {
            version: index.version,
            query: query.to_string(),
            total_matches,
            results,
        })
    }

    /// List one library's keywords, optionally filtered by a regex on the name.
    #[instrument(skip(self))]
    pub fn list_library_keywords(
        &self,
        library: Option<&str>,
        pattern: Option<&str>,
    ) -> Result<LibraryKeywordList> {
        let library = library.unwrap_or(DEFAULT_LIBRARY);
        if self.config.library(library).is_none() {
            return Err(RfDocsError::LibraryNotFound {
                library: library.to_string(),
                available: self.config.library_names(),
            });
        }

        let filter = compile_filter(pattern)?;
        let index = load_keyword_index(&self.config)?;
        let keywords = index
            .libraries
            .get(library)
            .ok_or_else(|| RfDocsError::LibraryNotFound {
                library: library.to_string(),
                available: index.libraries.keys().cloned().collect(),
            })?;

        let keywords = summarize(keywords, filter.as_ref());
        Ok(LibraryKeywordList {
            version: index.version,
            library: library.to_string(),
            filter: pattern.map(str::to_string),
            total_keywords: keywords.len(),
            keywords,
        })
    }

    /// [`list_library_keywords`](Self::list_library_keywords) for `BuiltIn`.
    pub fn builtin_keywords(&self, pattern: Option<&str>) -> Result<LibraryKeywordList> {
        self.list_library_keywords(Some(DEFAULT_LIBRARY), pattern)
    }

    /// List keywords of every indexed library; libraries without a match
    /// are left out.
    #[instrument(skip(self))]
    pub fn list_all_keywords(&self, pattern: Option<&str>) -> Result<AllKeywordList> {
        let filter = compile_filter(pattern)?;
        let index = load_keyword_index(&self.config)?;

        let libraries: BTreeMap<String, Vec<KeywordSummary>> = index
            .libraries
            .iter()
            .map(|(name, keywords)| (name.clone(), summarize(keywords, filter.as_ref())))
            .filter(|(_, keywords)| !keywords.is_empty())
            .collect();

        Ok(AllKeywordList {
            version: index.version,
            filter: pattern.map(str::to_string),
            total_libraries: libraries.len(),
            total_keywords: libraries.values().map(Vec::len).sum(),
            libraries,
        })
    }

    /// Find a keyword by name, ignoring case and `_`/`-`/space differences.
    ///
    /// With `library`, only that library is searched; otherwise the first
    /// match in configured library order wins. Not finding the keyword is a negative
    /// result, not an error.
    #[instrument(skip(self))]
    pub fn lookup_keyword(&self, name: &str, library: Option<&str>) -> Result<KeywordLookup> {
        let index = load_keyword_index(&self.config)?;
        let wanted = normalize_name(name);

        let found = match library {
            Some(library) => {
                let keywords = index.libraries.get(library).ok_or_else(|| {
                    RfDocsError::LibraryNotFound {
                        library: library.to_string(),
                        available: index.libraries.keys().cloned().collect(),
                    }
                })?;
                find_in(keywords, &wanted)
            }
            None => self
                .in_configured_order(&index.libraries)
                .find_map(|keywords| find_in(keywords, &wanted)),
        };

        let lookup = match found {
            Some(record) => KeywordLookup {
                version: index.version.clone(),
                keyword: record.name.clone(),
                available: true,
                library: Some(record.library.clone()),
                arguments: Some(record.args.clone()),
                documentation: Some(record.doc.clone()),
                url: Some(self.keyword_url(record)),
                message: None,
                hint: None,
            },
            None => {
                let scope = library.map_or_else(
                    || "any library".to_string(),
                    |library| format!("library '{library}'"),
                );
                KeywordLookup {
                    version: index.version.clone(),
                    keyword: name.to_string(),
                    available: false,
                    library: library.map(str::to_string),
                    arguments: None,
                    documentation: None,
                    url: None,
                    message: Some(format!("Keyword '{name}' not found in {scope}")),
                    hint: Some(
                        "Use list_all_keywords with a pattern to browse available keywords".into(),
                    ),
                }
            }
        };

        Ok(lookup)
    }

    /// Whether a keyword exists in any indexed library.
    pub fn keyword_available(&self, name: &str) -> Result<KeywordAvailability> {
        let lookup = self.lookup_keyword(name, None)?;

        let message = match &lookup.library {
            Some(library) if lookup.available => {
                format!("Keyword '{}' is available in {library}", lookup.keyword)
            }
            _ => format!("Keyword '{name}' is not available in any indexed library"),
        };

        Ok(KeywordAvailability {
            version: lookup.version,
            keyword_searched: name.to_string(),
            available: lookup.available,
            library: lookup.library.filter(|_| lookup.available),
            keyword_actual_name: lookup.available.then_some(lookup.keyword),
            message,
        })
    }

    /// Indexed libraries in configured order, then those no longer configured.
    fn in_configured_order<'a>(
        &'a self,
        libraries: &'a BTreeMap<String, KeywordMap>,
    ) -> impl Iterator<Item = &'a KeywordMap> + 'a {
        let configured = self
            .config
            .libraries
            .iter()
            .filter_map(|source| libraries.get(&source.name));
        let unlisted = libraries
            .iter()
            .filter(|(name, _)| self.config.library(name).is_none())
            .map(|(_, keywords)| keywords);
        configured.chain(unlisted)
    }

    fn keyword_url(&self, record: &KeywordRecord) -> String {
        let base = self
            .config
            .library(&record.library)
            .map_or(self.config.all_libraries_url.as_str(), |lib| lib.url.as_str());
        format!("{base}#{}", record.id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn relevance(section: &Section, needle: &str) -> usize {
    let title_hits = section.title.to_lowercase().matches(needle).count();
    let content_hits = section.content.to_lowercase().matches(needle).count();
    title_hits * TITLE_WEIGHT + content_hits * CONTENT_WEIGHT
}

/// First characters of the content, always followed by an ellipsis.
fn preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Lower-case and fold `_` and `-` into spaces.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '-'], " ")
}

fn find_in<'a>(keywords: &'a KeywordMap, wanted: &str) -> Option<&'a KeywordRecord> {
    keywords
        .values()
        .find(|record| normalize_name(&record.name) == wanted)
}

fn compile_filter(pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| RfDocsError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
        })
        .transpose()
}

/// Name-ordered summaries of the records whose raw name matches `filter`.
fn summarize(keywords: &KeywordMap, filter: Option<&Regex>) -> Vec<KeywordSummary> {
    keywords
        .values()
        .filter(|record| filter.is_none_or(|re| re.is_match(&record.name)))
        .map(|record| KeywordSummary {
            name: record.name.clone(),
            library: record.library.clone(),
            args: record.args.clone(),
            description: truncate_chars(&record.doc, DESCRIPTION_CHARS),
        })
        .collect()
}
