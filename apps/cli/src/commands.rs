//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use stepguide_core::GuideSession;
use stepguide_retrieval::{ContentScanner, HtmlPageScanner, SearchOutcome};
use stepguide_shared::{AppConfig, Article, init_config, load_config, load_config_from};
use tracing::info;

use crate::guide::{self, GuideOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// StepGuide — walk support agents through knowledge-base procedures.
#[derive(Parser)]
#[command(
    name = "stepguide",
    version,
    about = "Find the right support article and walk through it step by step.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.stepguide/stepguide.toml).
    #[arg(long, global = true, env = "STEPGUIDE_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Rank articles for a problem description.
    Search {
        /// Free-text problem description.
        query: String,

        /// Maximum number of results (defaults to retrieval.top_n).
        #[arg(short, long)]
        top: Option<usize>,

        /// Print the ranked matches as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List articles, optionally filtered by a substring.
    List {
        /// Case-insensitive substring of id, title, product, or tag.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show one article in full.
    Show {
        /// Article id.
        id: String,

        /// Print the article as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive guided session.
    Run {
        /// Article id to start directly (skips search).
        id: Option<String>,

        /// Problem description to search with.
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Extract a search query from an HTML page.
    Scan {
        /// HTML file to scan.
        page: PathBuf,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so the guided
/// conversation on stdout stays readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "stepguide=warn",
        1 => "stepguide=info",
        2 => "stepguide=debug",
        _ => "stepguide=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        };
    }

    let config = resolve_config(cli.config.as_deref())?;
    match cli.command {
        Command::Search { query, top, json } => cmd_search(&config, &query, top, json),
        Command::List { filter } => cmd_list(&config, filter.as_deref()),
        Command::Show { id, json } => cmd_show(&config, &id, json),
        Command::Run { id, query } => cmd_run(&config, id.as_deref(), query.as_deref()),
        Command::Scan { page } => cmd_scan(&config, &page),
        Command::Config { .. } => Ok(()),
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_search(config: &AppConfig, query: &str, top: Option<usize>, json: bool) -> Result<()> {
    let session = GuideSession::from_config(config)?;
    let top_n = resolve_top_n(config, top)?;
    info!(query, top_n, "searching articles");

    let outcome = session.search_top(query, top_n);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    print_matches(&outcome);
    Ok(())
}

/// `--top` overrides the configured result count but obeys the same floor.
fn resolve_top_n(config: &AppConfig, top: Option<usize>) -> Result<usize> {
    match top {
        Some(0) => Err(eyre!("--top must be at least 1")),
        Some(n) => Ok(n),
        None => Ok(config.retrieval.top_n),
    }
}

fn cmd_list(config: &AppConfig, filter: Option<&str>) -> Result<()> {
    let session = GuideSession::from_config(config)?;
    let articles = session.browse(filter.unwrap_or(""));

    if articles.is_empty() {
        println!("No articles match.");
        return Ok(());
    }
    for article in articles {
        println!(
            "  {:<28} {}  [{}]",
            article.id,
            article.title,
            article.product
        );
    }
    Ok(())
}

fn cmd_show(config: &AppConfig, id: &str, json: bool) -> Result<()> {
    let session = GuideSession::from_config(config)?;
    let article = session
        .get_article(id)
        .ok_or_else(|| eyre!("no article with id '{id}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(article)?);
        return Ok(());
    }
    print_article(article);
    Ok(())
}

fn cmd_run(config: &AppConfig, id: Option<&str>, query: Option<&str>) -> Result<()> {
    let mut session = GuideSession::from_config(config)?;

    let seed = match query {
        Some(q) => Some(q.to_string()),
        None if id.is_none() => scan_seed(config)?,
        None => None,
    };

    let options = GuideOptions {
        typing_indicator: config.features.typing_indicator,
    };
    info!(session_id = %session.id(), "starting guided session");
    guide::run_interactive(&mut session, id, seed, &options)
}

fn cmd_scan(config: &AppConfig, page: &Path) -> Result<()> {
    let scanner = HtmlPageScanner::new(page);
    match scanner.scan()? {
        Some(text) => {
            println!("Scanned query: {text}");
            let session = GuideSession::from_config(config)?;
            print_matches(&session.search(&text));
        }
        None => println!("Nothing useful found on the page."),
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared output helpers
// ---------------------------------------------------------------------------

/// Seed text from the page scanner, if the feature is enabled.
fn scan_seed(config: &AppConfig) -> Result<Option<String>> {
    let Some(page) = config.features.page_path.as_ref() else {
        return Ok(None);
    };
    let scanner = HtmlPageScanner::new(page);
    Ok(GuideSession::seed_query(config.features.page_scan, &scanner)?)
}

pub(crate) fn print_matches(outcome: &SearchOutcome<'_>) {
    match outcome {
        SearchOutcome::NoMatch => {
            println!("No matching articles. Try different words or `stepguide list`.");
        }
        SearchOutcome::Matches(list) => {
            if list.low_confidence {
                println!("  ! Low confidence: double-check the article fits the problem.");
            }
            for (i, m) in list.matches.iter().enumerate() {
                println!(
                    "  {}. {:<36} score {:>2}  ({})",
                    i + 1,
                    m.article.title,
                    m.score,
                    m.article.id
                );
            }
        }
    }
}

fn print_article(article: &Article) {
    println!();
    println!("  {}  ({})", article.title, article.id);
    println!("  Product: {}", article.product);
    if !article.tags.is_empty() {
        println!("  Tags:    {}", article.tags.join(", "));
    }
    if !article.summary.is_empty() {
        println!("  {}", article.summary);
    }
    if !article.prechecks.is_empty() {
        println!();
        println!("  Before you start:");
        for check in &article.prechecks {
            println!("    - {check}");
        }
    }
    println!();
    for (i, step) in article.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step.text);
    }
    for fallback in &article.fallbacks {
        println!();
        println!("  Fallback '{}': {}", fallback.id, fallback.condition);
        for (i, step) in fallback.steps.iter().enumerate() {
            println!("    {}. {}", i + 1, step.text);
        }
    }
    if let Some(esc) = &article.escalation {
        println!();
        println!("  Escalate to {} when: {}", esc.target, esc.when);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_zero_is_rejected() {
        let config = AppConfig::default();
        let err = resolve_top_n(&config, Some(0)).expect_err("zero rejected");
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn top_falls_back_to_config() {
        let mut config = AppConfig::default();
        config.retrieval.top_n = 4;
        assert_eq!(resolve_top_n(&config, None).expect("default"), 4);
        assert_eq!(resolve_top_n(&config, Some(2)).expect("override"), 2);
    }
}
