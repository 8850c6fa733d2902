//! Persisted index artifacts: atomic whole-file writes, versioned reads.
//!
//! A reader racing a rebuild sees either the previous or the new complete
//! file, never a partial one.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use rfdocs_shared::{
    CURRENT_SCHEMA_VERSION, IndexerConfig, KeywordIndex, Result, RfDocsError, SectionIndex,
};

/// An artifact stamped with the docs version and the layout version.
pub trait Versioned {
    /// Short name used in error messages (`section`, `keyword`).
    const KIND: &'static str;

    fn version(&self) -> &str;
    fn schema_version(&self) -> u32;
}

impl Versioned for SectionIndex {
    const KIND: &'static str = "section";

    fn version(&self) -> &str {
        &self.version
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

impl Versioned for KeywordIndex {
    const KIND: &'static str = "keyword";

    fn version(&self) -> &str {
        &self.version
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

/// Write `data` as pretty JSON to a sibling temp file, then rename over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RfDocsError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| RfDocsError::validation(format!("JSON serialization failed: {e}")))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact.json".to_string());
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json).map_err(|e| RfDocsError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| RfDocsError::io(path, e))?;

    debug!(path = %path.display(), "wrote artifact");
    Ok(())
}

/// Read an artifact and check it belongs to `version` and the current layout.
///
/// Absent, undecodable and mismatched artifacts all map to
/// [`RfDocsError::IndexMissing`]: each one is fixed by a rebuild.
pub fn read_versioned<T>(path: &Path, version: &str) -> Result<T>
where
    T: DeserializeOwned + Versioned,
{
    let missing = |reason: String| RfDocsError::index_missing(T::KIND, path, reason);

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(missing("file does not exist".into()));
        }
        Err(e) => return Err(RfDocsError::io(path, e)),
    };

    let artifact: T =
        serde_json::from_str(&content).map_err(|e| missing(format!("unreadable artifact: {e}")))?;

    if artifact.version() != version {
        return Err(missing(format!(
            "built for version {}, expected {version}",
            artifact.version()
        )));
    }
    if artifact.schema_version() != CURRENT_SCHEMA_VERSION {
        return Err(missing(format!(
            "schema_version {} not supported (expected {CURRENT_SCHEMA_VERSION})",
            artifact.schema_version()
        )));
    }

    Ok(artifact)
}

/// Load the section index for the configured version.
pub fn load_section_index(config: &IndexerConfig) -> Result<SectionIndex> {
    read_versioned(&config.section_index_path(), &config.version)
}

/// Load the keyword index for the configured version.
pub fn load_keyword_index(config: &IndexerConfig) -> Result<KeywordIndex> {
    read_versioned(&config.keyword_index_path(), &config.version)
}
