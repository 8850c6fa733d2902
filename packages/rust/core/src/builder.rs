//! Index builder: fetch -> extract -> normalize -> persist.
//!
//! Sources are processed one at a time in configured order. A failing
//! library is recorded in the report and the run carries on with the next
//! one; only the user guide decides overall success.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use rfdocs_extract::{LibraryKeywords, assignment_anchor, extract_sections, parse_library_document};
use rfdocs_fetcher::{FetchOutcome, Fetcher};
use rfdocs_shared::{
    FetchError, IndexerConfig, KeywordIndex, KeywordMap, LibrarySource, Result, RfDocsError,
    SectionIndex,
};

use crate::store::write_json_atomic;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting rebuild status.
pub trait RebuildProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each library document is processed.
    fn library(&self, name: &str, current: usize, total: usize);
    /// Called when the rebuild completes.
    fn done(&self, report: &RebuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RebuildProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn library(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RebuildReport) {}
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// How the user guide document was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DocumentStatus {
    /// Downloaded during this run (successfully or not).
    Fetched(FetchOutcome),
    /// Already present in its cache slot; no request was made.
    Cached {
        success: bool,
        cached: bool,
        path: String,
    },
}

impl DocumentStatus {
    fn cached(path: &Path) -> Self {
        Self::Cached {
            success: true,
            cached: true,
            path: path.display().to_string(),
        }
    }

    /// Whether the document is available in its slot.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Fetched(outcome) => outcome.success,
            Self::Cached { success, .. } => *success,
        }
    }
}

/// Outcome of building the section index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections_parsed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-library outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LibraryStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_keywords: Option<usize>,
    /// Why the library was not indexed; on success, the fetch failure that
    /// left the cached copy in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LibraryStatus {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total_keywords: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of writing the keyword index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordIndexStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub total_libraries: usize,
    pub total_keywords: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a rebuild did, per source.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub version: String,
    pub cache_location: String,
    /// Slot file names downloaded during this run.
    pub files_downloaded: Vec<String>,
    pub user_guide: DocumentStatus,
    pub indexing: IndexingStatus,
    pub libraries: BTreeMap<String, LibraryStatus>,
    pub keywords_index: KeywordIndexStatus,
    /// Whether the user guide was available.
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Sole writer of the section and keyword indexes.
pub struct IndexBuilder {
    config: IndexerConfig,
    fetcher: Fetcher,
    anchor: Regex,
}

impl IndexBuilder {
    /// Create a builder; fails only if the HTTP client cannot be constructed.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Create a builder around an existing fetcher.
    pub fn with_fetcher(config: IndexerConfig, fetcher: Fetcher) -> Self {
        let anchor = assignment_anchor(&config.anchor);
        Self {
            config,
            fetcher,
            anchor,
        }
    }

    /// The configuration this builder writes for.
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Fetch every source (skipping populated slots unless `force_refresh`),
    /// then overwrite both indexes.
    #[instrument(skip_all, fields(version = %self.config.version, force_refresh = force_refresh))]
    pub async fn rebuild(
        &self,
        force_refresh: bool,
        progress: &dyn RebuildProgress,
    ) -> Result<RebuildReport> {
        let start = Instant::now();
        let cache_dir = &self.config.cache_dir;
        std::fs::create_dir_all(cache_dir).map_err(|e| RfDocsError::io(cache_dir, e))?;

        info!(cache = %cache_dir.display(), "starting rebuild");
        let mut files_downloaded = Vec::new();

        // --- Phase 1: User guide ---
        progress.phase("Fetching user guide");
        let guide_slot = self.config.user_guide_slot();
        let user_guide = self
            .obtain(
                &self.config.user_guide_url,
                &guide_slot,
                force_refresh,
                &mut files_downloaded,
            )
            .await
            .map_or_else(|| DocumentStatus::cached(&guide_slot), DocumentStatus::Fetched);

        progress.phase("Indexing user guide");
        let indexing = if guide_slot.is_file() {
            if !user_guide.is_available() {
                warn!("user guide fetch failed; indexing the cached copy");
            }
            self.index_user_guide(&guide_slot)
        } else {
            IndexingStatus {
                error: Some("user guide not available".into()),
                ..IndexingStatus::default()
            }
        };

        // --- Phase 2: Libraries ---
        let total = self.config.libraries.len();
        let mut libraries = BTreeMap::new();
        let mut parsed: BTreeMap<String, KeywordMap> = BTreeMap::new();

        for (i, source) in self.config.libraries.iter().enumerate() {
            progress.library(&source.name, i + 1, total);
            let (status, keywords) = self
                .process_library(source, force_refresh, &mut files_downloaded)
                .await;
            if let Some(keywords) = keywords {
                parsed.insert(source.name.clone(), keywords);
            }
            libraries.insert(source.name.clone(), status);
        }

        // --- Phase 3: Keyword index ---
        progress.phase("Writing keyword index");
        let keywords_index = self.write_keyword_index(parsed);

        let report = RebuildReport {
            version: self.config.version.clone(),
            cache_location: cache_dir.display().to_string(),
            files_downloaded,
            success: user_guide.is_available(),
            user_guide,
            indexing,
            libraries,
            keywords_index,
        };

        info!(
            success = report.success,
            downloaded = report.files_downloaded.len(),
            keywords = report.keywords_index.total_keywords,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "rebuild complete"
        );
        progress.done(&report);

        Ok(report)
    }

    /// Fetch `url` into `slot` unless the slot is already populated.
    ///
    /// Returns `None` when the cached slot was used.
    async fn obtain(
        &self,
        url: &str,
        slot: &Path,
        force_refresh: bool,
        files_downloaded: &mut Vec<String>,
    ) -> Option<FetchOutcome> {
        if !force_refresh && slot.is_file() {
            info!(slot = %slot.display(), "using cached document");
            return None;
        }

        let outcome = self.fetcher.fetch_to_slot(url, slot).await;
        if outcome.success {
            if let Some(name) = slot.file_name() {
                files_downloaded.push(name.to_string_lossy().into_owned());
            }
        }
        Some(outcome)
    }

    fn index_user_guide(&self, slot: &Path) -> IndexingStatus {
        let html = match read_document(slot) {
            Ok(html) => html,
            Err(e) => {
                return IndexingStatus {
                    error: Some(e.to_string()),
                    ..IndexingStatus::default()
                };
            }
        };

        let index = SectionIndex::new(&self.config.version, extract_sections(&html));
        let path = self.config.section_index_path();

        match write_json_atomic(&path, &index) {
            Ok(()) => {
                info!(sections = index.total_sections, "section index written");
                IndexingStatus {
                    success: true,
                    sections_parsed: Some(index.total_sections),
                    index_path: Some(path.display().to_string()),
                    error: None,
                }
            }
            Err(e) => IndexingStatus {
                error: Some(e.to_string()),
                ..IndexingStatus::default()
            },
        }
    }

    #[instrument(skip_all, fields(library = %source.name))]
    async fn process_library(
        &self,
        source: &LibrarySource,
        force_refresh: bool,
        files_downloaded: &mut Vec<String>,
    ) -> (LibraryStatus, Option<KeywordMap>) {
        let slot = self.config.library_slot(&source.name);

        let fetch_failure = self
            .obtain(&source.url, &slot, force_refresh, files_downloaded)
            .await
            .and_then(|outcome| outcome.failure);

        match self.index_library(source, &slot, fetch_failure.clone()) {
            Ok(parsed) => {
                info!(keywords = parsed.total_keywords, "library indexed");
                let status = LibraryStatus {
                    success: true,
                    total_keywords: Some(parsed.total_keywords),
                    error: fetch_failure.map(|failure| failure.to_string()),
                };
                (status, Some(parsed.keywords))
            }
            Err(e) => {
                warn!(error = %e, "library not indexed");
                (LibraryStatus::failed(e.to_string()), None)
            }
        }
    }

    /// Parse whatever the slot holds; a failed fetch only matters when the
    /// slot is empty.
    fn index_library(
        &self,
        source: &LibrarySource,
        slot: &Path,
        fetch_failure: Option<FetchError>,
    ) -> Result<LibraryKeywords> {
        match fetch_failure {
            Some(failure) if !slot.is_file() => return Err(failure.into()),
            Some(failure) => warn!(error = %failure, "fetch failed; indexing the cached copy"),
            None => {}
        }

        let html = read_document(slot)?;
        Ok(parse_library_document(&html, &self.anchor, &source.name)?)
    }

    fn write_keyword_index(&self, parsed: BTreeMap<String, KeywordMap>) -> KeywordIndexStatus {
        if parsed.is_empty() {
            warn!("no library was parsed; keeping the previous keyword index");
            return KeywordIndexStatus {
                error: Some("no library could be parsed".into()),
                ..KeywordIndexStatus::default()
            };
        }

        let index = KeywordIndex::new(&self.config.version, parsed);
        let path = self.config.keyword_index_path();

        match write_json_atomic(&path, &index) {
            Ok(()) => {
                info!(
                    libraries = index.total_libraries,
                    keywords = index.total_keywords,
                    "keyword index written"
                );
                KeywordIndexStatus {
                    success: true,
                    path: Some(path.display().to_string()),
                    total_libraries: index.total_libraries,
                    total_keywords: index.total_keywords,
                    error: None,
                }
            }
            Err(e) => KeywordIndexStatus {
                total_libraries: index.total_libraries,
                total_keywords: index.total_keywords,
                error: Some(e.to_string()),
                ..KeywordIndexStatus::default()
            },
        }
    }
}

/// Read a cached document; invalid UTF-8 is replaced rather than rejected.
fn read_document(slot: &Path) -> Result<String> {
    let bytes = std::fs::read(slot).map_err(|e| RfDocsError::io(slot, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, Site};

    fn strip_parsed_at(path: &Path) -> serde_json::Value {
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("parsed_at");
        value
    }

    #[tokio::test]
    async fn rebuild_writes_both_indexes() {
        let site = Site::start().await;
        site.serve_all(1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let config = site.config(tmp.path());

        let report = IndexBuilder::new(config.clone())
            .unwrap()
            .rebuild(false, &SilentProgress)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.version, "7.4.1");
        assert_eq!(report.files_downloaded.len(), 3);
        assert!(report.indexing.success);
        assert_eq!(report.indexing.sections_parsed, Some(3));
        assert_eq!(report.libraries["BuiltIn"].total_keywords, Some(3));
        assert_eq!(report.libraries["String"].total_keywords, Some(2));
        assert_eq!(report.keywords_index.total_libraries, 2);
        assert_eq!(report.keywords_index.total_keywords, 5);

        let sections = crate::store::load_section_index(&config).unwrap();
        assert_eq!(sections.sections[0].title, "Introduction");
        let keywords = crate::store::load_keyword_index(&config).unwrap();
        assert_eq!(
            keywords.libraries["BuiltIn"]["Run Keyword"].args,
            "name, *args"
        );
    }

    #[tokio::test]
    async fn partial_failure_keeps_other_libraries() {
        let site = Site::start().await;
        site.serve_user_guide(1).await;
        site.serve_library("BuiltIn", testutil::BUILTIN_JSON, 1).await;
        site.fail_library("String", 404).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let config = site.config(tmp.path());

        let report = IndexBuilder::new(config.clone())
            .unwrap()
            .rebuild(false, &SilentProgress)
            .await
            .unwrap();

        assert!(report.success);
        let string = &report.libraries["String"];
        assert!(!string.success);
        assert_eq!(
            string.error.as_deref(),
            Some("fetch error: HTTP Error 404: Not Found")
        );
        assert!(report.libraries["BuiltIn"].success);

        let keywords = crate::store::load_keyword_index(&config).unwrap();
        assert_eq!(keywords.total_libraries, 1);
        assert_eq!(keywords.total_keywords, 3);
        assert!(keywords.libraries.contains_key("BuiltIn"));
        assert!(!keywords.libraries.contains_key("String"));
    }

    #[tokio::test]
    async fn second_run_uses_cache_and_reproduces_artifacts() {
        let site = Site::start().await;
        // Each document may be requested exactly once across both runs.
        site.serve_all(1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let config = site.config(tmp.path());
        let builder = IndexBuilder::new(config.clone()).unwrap();

        builder.rebuild(false, &SilentProgress).await.unwrap();
        let sections_before = strip_parsed_at(&config.section_index_path());
        let keywords_before = strip_parsed_at(&config.keyword_index_path());

        let report = builder.rebuild(false, &SilentProgress).await.unwrap();

        assert!(report.files_downloaded.is_empty());
        assert!(matches!(
            report.user_guide,
            DocumentStatus::Cached { cached: true, .. }
        ));
        assert_eq!(strip_parsed_at(&config.section_index_path()), sections_before);
        assert_eq!(strip_parsed_at(&config.keyword_index_path()), keywords_before);
    }

    #[tokio::test]
    async fn force_refresh_fetches_again() {
        let site = Site::start().await;
        site.serve_all(2).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let builder = IndexBuilder::new(site.config(tmp.path())).unwrap();

        builder.rebuild(false, &SilentProgress).await.unwrap();
        let report = builder.rebuild(true, &SilentProgress).await.unwrap();

        assert_eq!(report.files_downloaded.len(), 3);
    }

    #[tokio::test]
    async fn failed_refresh_reindexes_cached_documents() {
        let site = Site::start().await;
        site.serve_all(1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let config = site.config(tmp.path());
        let builder = IndexBuilder::new(config.clone()).unwrap();
        builder.rebuild(false, &SilentProgress).await.unwrap();

        site.server.reset().await;
        site.fail_user_guide(503).await;
        site.serve_library("BuiltIn", testutil::BUILTIN_JSON, 1).await;
        site.fail_library("String", 500).await;

        let report = builder.rebuild(true, &SilentProgress).await.unwrap();

        assert!(!report.success);
        assert!(report.indexing.success);
        assert_eq!(report.indexing.sections_parsed, Some(3));
        assert_eq!(report.files_downloaded, ["BuiltIn_7.4.1.html"]);

        let string = &report.libraries["String"];
        assert!(string.success);
        assert_eq!(string.total_keywords, Some(2));
        assert_eq!(
            string.error.as_deref(),
            Some("HTTP Error 500: Internal Server Error")
        );

        let keywords = crate::store::load_keyword_index(&config).unwrap();
        assert_eq!(keywords.total_libraries, 2);
        assert!(keywords.libraries["String"].contains_key("Split String"));
    }

    #[tokio::test]
    async fn missing_user_guide_fails_run_but_indexes_libraries() {
        let site = Site::start().await;
        site.fail_user_guide(500).await;
        site.serve_library("BuiltIn", testutil::BUILTIN_JSON, 1).await;
        site.serve_library("String", testutil::STRING_JSON, 1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let config = site.config(tmp.path());

        let report = IndexBuilder::new(config.clone())
            .unwrap()
            .rebuild(false, &SilentProgress)
            .await
            .unwrap();

        assert!(!report.success);
        assert!(!report.indexing.success);
        assert!(!config.section_index_path().exists());
        assert!(report.keywords_index.success);
        assert!(config.keyword_index_path().exists());
    }

    #[tokio::test]
    async fn unparseable_library_is_reported() {
        let site = Site::start().await;
        site.serve_user_guide(1).await;
        site.serve_raw_library("BuiltIn", "<html><body>no data here</body></html>")
            .await;
        site.serve_raw_library("String", "<script>libdoc = {\"keywords\": [</script>")
            .await;
        let tmp = tempfile::TempDir::new().unwrap();
        let config = site.config(tmp.path());

        let report = IndexBuilder::new(config.clone())
            .unwrap()
            .rebuild(false, &SilentProgress)
            .await
            .unwrap();

        assert!(report.success);
        assert!(
            report.libraries["BuiltIn"]
                .error
                .as_deref()
                .unwrap()
                .contains("could not find")
        );
        assert!(!report.libraries["String"].success);
        assert!(!report.keywords_index.success);
        assert!(!config.keyword_index_path().exists());
    }
}
