//! `DocsService`: every operation behind one handle.
//!
//! Rebuilds are serialized by a mutex. A query that finds its index missing
//! triggers one non-forced rebuild and is retried once.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use rfdocs_shared::{IndexerConfig, Result};

use crate::builder::{IndexBuilder, RebuildProgress, RebuildReport, SilentProgress};
use crate::query::{
    AllKeywordList, KeywordAvailability, KeywordLookup, LibraryKeywordList, QueryLayer,
    SearchResponse,
};
use crate::urls::{DocumentationUrls, documentation_urls};

pub struct DocsService {
    config: IndexerConfig,
    builder: Mutex<IndexBuilder>,
    query: QueryLayer,
    progress: Arc<dyn RebuildProgress>,
}

impl DocsService {
    /// Build the service; fails only if the HTTP client cannot be constructed.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        let builder = IndexBuilder::new(config.clone())?;
        Ok(Self {
            query: QueryLayer::new(config.clone()),
            builder: Mutex::new(builder),
            config,
            progress: Arc::new(SilentProgress),
        })
    }

    /// Report rebuild progress (explicit and automatic) to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn RebuildProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Refresh the cache and overwrite both indexes.
    pub async fn rebuild(&self, force_refresh: bool) -> Result<RebuildReport> {
        let builder = self.builder.lock().await;
        builder.rebuild(force_refresh, self.progress.as_ref()).await
    }

    pub async fn search_sections(&self, query: &str, max_results: usize) -> Result<SearchResponse> {
        self.with_index(|q| q.search_sections(query, max_results))
            .await
    }

    pub async fn list_library_keywords(
        &self,
        library: Option<&str>,
        pattern: Option<&str>,
    ) -> Result<LibraryKeywordList> {
        self.with_index(|q| q.list_library_keywords(library, pattern))
            .await
    }

    pub async fn builtin_keywords(&self, pattern: Option<&str>) -> Result<LibraryKeywordList> {
        self.with_index(|q| q.builtin_keywords(pattern)).await
    }

    pub async fn list_all_keywords(&self, pattern: Option<&str>) -> Result<AllKeywordList> {
        self.with_index(|q| q.list_all_keywords(pattern)).await
    }

    pub async fn lookup_keyword(&self, name: &str, library: Option<&str>) -> Result<KeywordLookup> {
        self.with_index(|q| q.lookup_keyword(name, library)).await
    }

    pub async fn keyword_available(&self, name: &str) -> Result<KeywordAvailability> {
        self.with_index(|q| q.keyword_available(name)).await
    }

    pub fn documentation_urls(&self, topic: Option<&str>) -> DocumentationUrls {
        documentation_urls(&self.config, topic)
    }

    /// Run `op`; on `IndexMissing`, rebuild once and run it again.
    #[instrument(skip_all)]
    async fn with_index<T>(&self, op: impl Fn(&QueryLayer) -> Result<T>) -> Result<T> {
        match op(&self.query) {
            Err(err) if err.is_index_missing() => {
                info!(reason = %err, "index missing; rebuilding");
                self.rebuild(false).await?;
                op(&self.query)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfdocs_shared::RfDocsError;

    use crate::testutil::Site;

    #[tokio::test]
    async fn query_on_empty_cache_rebuilds_once() {
        let site = Site::start().await;
        site.serve_all(1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let service = DocsService::new(site.config(tmp.path())).unwrap();

        let response = service.search_sections("library", 10).await.unwrap();
        assert_eq!(response.total_matches, 2);
        assert_eq!(response.results[0].id, "using-the-library-keywords");

        // Indexes now exist: no further requests.
        let lookup = service.lookup_keyword("split_string", None).await.unwrap();
        assert!(lookup.available);
        assert_eq!(lookup.library.as_deref(), Some("String"));
        assert_eq!(
            lookup.documentation.as_deref(),
            Some("Splits the string using separator.")
        );
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_index_missing() {
        let site = Site::start().await;
        site.fail_user_guide(503).await;
        site.fail_library("BuiltIn", 503).await;
        site.fail_library("String", 503).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let service = DocsService::new(site.config(tmp.path())).unwrap();

        let err = service.search_sections("library", 10).await.unwrap_err();
        assert!(err.is_index_missing());

        let err = service.keyword_available("Log").await.unwrap_err();
        assert!(matches!(err, RfDocsError::IndexMissing { .. }));
    }

    #[tokio::test]
    async fn query_errors_do_not_trigger_rebuild() {
        let site = Site::start().await;
        site.serve_all(1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let service = DocsService::new(site.config(tmp.path())).unwrap();
        service.rebuild(false).await.unwrap();

        let err = service.list_all_keywords(Some("(")).await.unwrap_err();
        assert!(matches!(err, RfDocsError::InvalidPattern { .. }));

        let listing = service.builtin_keywords(None).await.unwrap();
        assert_eq!(listing.total_keywords, 3);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_rebuild_at_a_time() {
        let site = Site::start().await;
        site.serve_all(1).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let service = DocsService::new(site.config(tmp.path())).unwrap();

        // The second rebuild waits for the first and then finds every slot cached.
        let (a, b) = tokio::join!(service.rebuild(false), service.rebuild(false));
        let downloaded = a.unwrap().files_downloaded.len() + b.unwrap().files_downloaded.len();
        assert_eq!(downloaded, 3);
    }

    #[tokio::test]
    async fn documentation_urls_need_no_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = IndexerConfig {
            cache_dir: tmp.path().to_path_buf(),
            ..IndexerConfig::from(&rfdocs_shared::AppConfig::default())
        };
        let service = DocsService::new(config).unwrap();

        let urls = service.documentation_urls(Some("release_notes"));
        assert!(urls.urls["release_notes"].as_str().unwrap().contains("rf-7.4.1"));
    }
}
