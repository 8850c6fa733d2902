//! Shared types, error model, and configuration for rfdocs.
//!
//! This crate is the foundation depended on by all other rfdocs crates.
//! It provides:
//! - [`RfDocsError`]: the unified error type, with [`FetchError`] and [`ParseError`]
//! - The persisted model ([`Section`], [`SectionIndex`], [`KeywordRecord`], [`KeywordIndex`])
//! - Configuration ([`AppConfig`], [`IndexerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, DEFAULT_USER_AGENT, ENV_CACHE, ENV_CONFIG, ENV_USER_AGENT,
    ExtractConfig, HttpConfig, IndexerConfig, LibraryEntry, LibrarySource, SourceConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{FetchError, ParseError, Result, RfDocsError};
pub use types::{
    CURRENT_SCHEMA_VERSION, KeywordIndex, KeywordMap, KeywordRecord, Section, SectionIndex,
};
