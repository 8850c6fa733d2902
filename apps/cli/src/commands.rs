//! CLI command definitions, routing, and tracing setup.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use rfdocs_core::{DocsService, ErrorPayload, RebuildProgress, RebuildReport};
use rfdocs_shared::{AppConfig, IndexerConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rfdocs: Robot Framework documentation lookup.
#[derive(Parser)]
#[command(
    name = "rfdocs",
    version,
    about = "Fetch, index and query the Robot Framework user guide and standard library docs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download the documents (unless cached) and rebuild both indexes.
    Rebuild {
        /// Re-download documents even if they are cached.
        #[arg(long)]
        force: bool,
    },

    /// Search user guide sections.
    Search {
        /// Text to look for in section titles and content.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'n', long, default_value_t = 10)]
        max_results: usize,
    },

    /// List the keywords of one library.
    Keywords {
        /// Library name (defaults to BuiltIn).
        library: Option<String>,

        /// Case-insensitive regex applied to keyword names.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List the keywords of every indexed library.
    AllKeywords {
        /// Case-insensitive regex applied to keyword names.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List BuiltIn keywords.
    Builtin {
        /// Case-insensitive regex applied to keyword names.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show the documentation of one keyword.
    Lookup {
        /// Keyword name; case, `_` and `-` are ignored.
        name: String,

        /// Only search this library.
        #[arg(short, long)]
        library: Option<String>,
    },

    /// Check whether a keyword exists in any indexed library.
    Available {
        /// Keyword name; case, `_` and `-` are ignored.
        name: String,
    },

    /// Print reference documentation URLs.
    Urls {
        /// Only print this entry (user_guide, builtin_library, release_notes,
        /// all_libraries, standard_libraries).
        topic: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rfdocs=info",
        1 => "rfdocs=debug",
        _ => "rfdocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Rebuild { force } => {
            info!(force, "rebuilding indexes");
            emit(service()?.rebuild(force).await)
        }
        Command::Search { query, max_results } => {
            emit(service()?.search_sections(&query, max_results).await)
        }
        Command::Keywords { library, filter } => emit(
            service()?
                .list_library_keywords(library.as_deref(), filter.as_deref())
                .await,
        ),
        Command::AllKeywords { filter } => {
            emit(service()?.list_all_keywords(filter.as_deref()).await)
        }
        Command::Builtin { filter } => emit(service()?.builtin_keywords(filter.as_deref()).await),
        Command::Lookup { name, library } => {
            emit(service()?.lookup_keyword(&name, library.as_deref()).await)
        }
        Command::Available { name } => emit(service()?.keyword_available(&name).await),
        Command::Urls { topic } => {
            print_json(&service()?.documentation_urls(topic.as_deref()))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Service over the resolved configuration, reporting rebuilds on stderr.
fn service() -> Result<DocsService> {
    let config = IndexerConfig::from(&load_config()?);
    let service = DocsService::new(config)?.with_progress(Arc::new(CliProgress::new()));
    Ok(service)
}

/// Print an operation's result, or its error as a structured payload.
fn emit<T: Serialize>(result: rfdocs_shared::Result<T>) -> Result<ExitCode> {
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            warn!(error = %err, "operation failed");
            print_json(&ErrorPayload::from(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr; stays invisible until a rebuild actually starts.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        Self { spinner }
    }
}

impl RebuildProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner.set_message(name.to_string());
    }

    fn library(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Indexing library [{current}/{total}] {name}"));
    }

    fn done(&self, report: &RebuildReport) {
        self.spinner.finish_and_clear();
        info!(
            success = report.success,
            downloaded = report.files_downloaded.len(),
            "indexes rebuilt"
        );
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show() -> Result<ExitCode> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_commands() {
        let cli = Cli::try_parse_from(["rfdocs", "search", "variables", "-n", "3"]).unwrap();
        match cli.command {
            Command::Search { query, max_results } => {
                assert_eq!(query, "variables");
                assert_eq!(max_results, 3);
            }
            _ => panic!("expected search"),
        }

        let cli =
            Cli::try_parse_from(["rfdocs", "keywords", "String", "--filter", "^split"]).unwrap();
        match cli.command {
            Command::Keywords { library, filter } => {
                assert_eq!(library.as_deref(), Some("String"));
                assert_eq!(filter.as_deref(), Some("^split"));
            }
            _ => panic!("expected keywords"),
        }
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::try_parse_from(["rfdocs", "rebuild", "--force", "-vv", "--log-format", "json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Command::Rebuild { force: true }));
    }

    #[test]
    fn lookup_library_is_optional() {
        let cli = Cli::try_parse_from(["rfdocs", "lookup", "run_keyword"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Lookup { ref name, library: None } if name == "run_keyword"
        ));
    }
}
