//! Index building and querying for rfdocs.
//!
//! The [`IndexBuilder`] turns fetched documents into the section and keyword
//! indexes; the [`QueryLayer`] answers searches and lookups from them;
//! [`DocsService`] combines both behind one handle.

pub mod builder;
pub mod payload;
pub mod query;
pub mod service;
pub mod store;
pub mod urls;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::{
    DocumentStatus, IndexBuilder, IndexingStatus, KeywordIndexStatus, LibraryStatus,
    RebuildProgress, RebuildReport, SilentProgress,
};
pub use payload::ErrorPayload;
pub use query::{
    AllKeywordList, KeywordAvailability, KeywordLookup, KeywordSummary, LibraryKeywordList,
    QueryLayer, SearchHit, SearchResponse,
};
pub use service::DocsService;
pub use urls::{DocumentationUrls, documentation_urls};
