//! Application configuration for rfdocs.
//!
//! User config lives at `~/.rfdocs/rfdocs.toml` (or wherever `RF_DOCS_CONFIG`
//! points). Environment variables override config file values, which
//! override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, RfDocsError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rfdocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rfdocs";

/// Points at an alternative config file.
pub const ENV_CONFIG: &str = "RF_DOCS_CONFIG";
/// Overrides `[cache] dir`.
pub const ENV_CACHE: &str = "RF_DOCS_CACHE";
/// Overrides `[http] user_agent`.
pub const ENV_USER_AGENT: &str = "RF_DOCS_USER_AGENT";

/// Default identifying header for outbound requests.
pub const DEFAULT_USER_AGENT: &str =
    concat!("Mozilla/5.0 (compatible; rfdocs/", env!("CARGO_PKG_VERSION"), ")");

// ---------------------------------------------------------------------------
// Config structs (matching rfdocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which documents to index.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where fetched documents and indexes live.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound request settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Embedded-JSON extraction settings.
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Documentation version; part of every cache slot name.
    #[serde(default = "default_version")]
    pub version: String,

    /// User guide URL template (`{version}` placeholder).
    #[serde(default = "default_user_guide_url")]
    pub user_guide_url: String,

    /// Library document URL template (`{version}` and `{path}` placeholders).
    #[serde(default = "default_library_url_template")]
    pub library_url_template: String,

    /// Release notes URL template (`{version}` placeholder).
    #[serde(default = "default_release_notes_url")]
    pub release_notes_url: String,

    /// Libraries to index, in processing order.
    #[serde(default = "default_libraries")]
    pub libraries: Vec<LibraryEntry>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            user_guide_url: default_user_guide_url(),
            library_url_template: default_library_url_template(),
            release_notes_url: default_release_notes_url(),
            libraries: default_libraries(),
        }
    }
}

fn default_version() -> String {
    "7.4.1".into()
}
fn default_user_guide_url() -> String {
    "https://robotframework.org/robotframework/{version}/RobotFrameworkUserGuide.html".into()
}
fn default_library_url_template() -> String {
    "https://robotframework.org/robotframework/{version}/libraries/{path}".into()
}
fn default_release_notes_url() -> String {
    "https://github.com/robotframework/robotframework/blob/master/doc/releasenotes/rf-{version}.rst"
        .into()
}
fn default_libraries() -> Vec<LibraryEntry> {
    [
        "BuiltIn",
        "Collections",
        "DateTime",
        "OperatingSystem",
        "Process",
        "Screenshot",
        "String",
        "Telnet",
        "XML",
    ]
    .into_iter()
    .map(|name| LibraryEntry {
        name: name.into(),
        path: format!("{name}.html"),
    })
    .collect()
}

/// `[[source.libraries]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Library name as it appears in the keyword index.
    pub name: String,
    /// Document path relative to the library URL template.
    pub path: String,
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache root for fetched documents and indexes.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    std::env::temp_dir()
        .join("rf_docs_cache")
        .to_string_lossy()
        .into_owned()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// `User-Agent` sent with every fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Name assigned the keyword JSON in library documents (`<anchor> = {...}`).
    #[serde(default = "default_anchor")]
    pub anchor: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            anchor: default_anchor(),
        }
    }
}

fn default_anchor() -> String {
    "libdoc".into()
}

impl AppConfig {
    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_CACHE).filter(|v| !v.is_empty()) {
            self.cache.dir = dir;
        }
        if let Some(agent) = lookup(ENV_USER_AGENT).filter(|v| !v.is_empty()) {
            self.http.user_agent = agent;
        }
    }
}

// ---------------------------------------------------------------------------
// Indexer config (runtime, resolved from AppConfig)
// ---------------------------------------------------------------------------

/// One library document to fetch and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySource {
    /// Library name.
    pub name: String,
    /// Absolute document URL.
    pub url: String,
}

/// Resolved configuration handed to the index builder and query layer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Documentation version.
    pub version: String,
    /// Cache root for documents and indexes.
    pub cache_dir: PathBuf,
    /// Absolute user guide URL.
    pub user_guide_url: String,
    /// Libraries in processing order.
    pub libraries: Vec<LibrarySource>,
    /// Library listing page.
    pub all_libraries_url: String,
    /// Release notes page.
    pub release_notes_url: String,
    /// Default `User-Agent`.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Name the keyword JSON is assigned to in library documents.
    pub anchor: String,
}

impl From<&AppConfig> for IndexerConfig {
    fn from(config: &AppConfig) -> Self {
        let source = &config.source;
        let version = source.version.as_str();
        Self {
            version: source.version.clone(),
            cache_dir: PathBuf::from(&config.cache.dir),
            user_guide_url: expand_template(&source.user_guide_url, version, ""),
            libraries: source
                .libraries
                .iter()
                .map(|lib| LibrarySource {
                    name: lib.name.clone(),
                    url: expand_template(&source.library_url_template, version, &lib.path),
                })
                .collect(),
            all_libraries_url: expand_template(&source.library_url_template, version, ""),
            release_notes_url: expand_template(&source.release_notes_url, version, ""),
            user_agent: config.http.user_agent.clone(),
            timeout_secs: config.http.timeout_secs,
            anchor: config.extract.anchor.clone(),
        }
    }
}

impl IndexerConfig {
    /// Cache slot for the raw user guide HTML.
    pub fn user_guide_slot(&self) -> PathBuf {
        let stem = slot_stem(&self.user_guide_url, "user_guide");
        self.cache_dir.join(format!("{stem}_{}.html", self.version))
    }

    /// Cache slot for a library's raw HTML.
    pub fn library_slot(&self, library: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}_{}.html", sanitize(library), self.version))
    }

    /// Path of the persisted section index.
    pub fn section_index_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("docs_index_{}.json", self.version))
    }

    /// Path of the persisted keyword index.
    pub fn keyword_index_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("all_keywords_{}.json", self.version))
    }

    /// Look up a configured library by exact name.
    pub fn library(&self, name: &str) -> Option<&LibrarySource> {
        self.libraries.iter().find(|lib| lib.name == name)
    }

    /// Configured library names, in processing order.
    pub fn library_names(&self) -> Vec<String> {
        self.libraries.iter().map(|lib| lib.name.clone()).collect()
    }
}

/// Substitute `{version}` and `{path}` placeholders.
fn expand_template(template: &str, version: &str, path: &str) -> String {
    template.replace("{version}", version).replace("{path}", path)
}

/// File-name stem for a document URL: last path segment without extension.
fn slot_stem(url: &str, fallback: &str) -> String {
    let segment = Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
    });

    match segment {
        Some(s) => {
            let stem = s.trim_end_matches(".html").trim_end_matches(".htm");
            if stem.is_empty() {
                fallback.to_string()
            } else {
                sanitize(stem)
            }
        }
        None => fallback.to_string(),
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rfdocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| RfDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`RF_DOCS_CONFIG` or `~/.rfdocs/rfdocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    match std::env::var(ENV_CONFIG) {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Load the application config from disk and apply environment overrides.
/// Uses defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RfDocsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RfDocsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| RfDocsError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RfDocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RfDocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
