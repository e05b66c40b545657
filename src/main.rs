use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unified_search::config::{find_config_file, load_config, Config};
use unified_search::mcp::McpServer;
use unified_search::models::{
    SafeSearch, SearchFilters, SearchRequest, SourceKind, UploadDate, VideoDuration, VideoSort,
};
use unified_search::ui::{self, Status};
use unified_search::UnifiedSearch;

/// Unified Search - one query across academic papers, the web and videos
#[derive(Parser, Debug)]
#[command(name = "unified-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search Google Scholar, Google web search and YouTube with one query", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceArg {
    Academic,
    Web,
    Video,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Academic => SourceKind::Academic,
            SourceArg::Web => SourceKind::Web,
            SourceArg::Video => SourceKind::Video,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SafeSearchArg {
    High,
    Medium,
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DurationArg {
    Short,
    Medium,
    Long,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum UploadDateArg {
    Hour,
    Today,
    Week,
    Month,
    Year,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    Relevance,
    Date,
    Rating,
    ViewCount,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (stdio by default)
    Serve {
        /// Serve streamable HTTP on this address instead of stdio
        #[arg(long, value_name = "ADDR")]
        http: Option<String>,
    },

    /// Search one or more sources
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Sources to search (default: every configured source)
        #[arg(long, short, value_enum, value_delimiter = ',')]
        sources: Vec<SourceArg>,

        /// Results per source (default from config)
        #[arg(long, short = 'n')]
        num_results: Option<usize>,

        /// Academic: restrict to papers by this author
        #[arg(long, short)]
        author: Option<String>,

        /// Academic: earliest publication year
        #[arg(long)]
        year_start: Option<i32>,

        /// Academic: latest publication year
        #[arg(long)]
        year_end: Option<i32>,

        /// Web: result language code
        #[arg(long)]
        language: Option<String>,

        /// Web: safe-search level
        #[arg(long, value_enum)]
        safe_search: Option<SafeSearchArg>,

        /// Video: length bucket
        #[arg(long, value_enum)]
        duration: Option<DurationArg>,

        /// Video: maximum upload age
        #[arg(long, value_enum)]
        upload_date: Option<UploadDateArg>,

        /// Video: sort order
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },

    /// Look up an academic author profile
    #[command(alias = "a")]
    Author {
        /// Author name
        name: String,
    },

    /// Show API usage, quota and cache statistics
    Stats,

    /// Show readiness of every source and the cache
    Status {
        /// Run a minimal live query against each configured source
        #[arg(long)]
        probe: bool,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Clear cached results
    Clear {
        /// Only clear entries of this source
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

#[allow(clippy::too_many_arguments)]
fn build_filters(
    author: Option<String>,
    year_start: Option<i32>,
    year_end: Option<i32>,
    language: Option<String>,
    safe_search: Option<SafeSearchArg>,
    duration: Option<DurationArg>,
    upload_date: Option<UploadDateArg>,
    sort: Option<SortArg>,
) -> SearchFilters {
    let mut filters = SearchFilters::default();
    filters.academic.author = author;
    filters.academic.year_start = year_start;
    filters.academic.year_end = year_end;
    if let Some(language) = language {
        filters.web.language = language;
    }
    if let Some(level) = safe_search {
        filters.web.safe_search = match level {
            SafeSearchArg::High => SafeSearch::High,
            SafeSearchArg::Medium => SafeSearch::Medium,
            SafeSearchArg::Off => SafeSearch::Off,
        };
    }
    filters.video.duration = duration.map(|d| match d {
        DurationArg::Short => VideoDuration::Short,
        DurationArg::Medium => VideoDuration::Medium,
        DurationArg::Long => VideoDuration::Long,
    });
    filters.video.upload_date = upload_date.map(|u| match u {
        UploadDateArg::Hour => UploadDate::Hour,
        UploadDateArg::Today => UploadDate::Today,
        UploadDateArg::Week => UploadDate::Week,
        UploadDateArg::Month => UploadDate::Month,
        UploadDateArg::Year => UploadDate::Year,
    });
    if let Some(sort) = sort {
        filters.video.sort = match sort {
            SortArg::Relevance => VideoSort::Relevance,
            SortArg::Date => VideoSort::Date,
            SortArg::Rating => VideoSort::Rating,
            SortArg::ViewCount => VideoSort::ViewCount,
        };
    }
    filters
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("unified_search={}", level)));

    // stdout carries MCP frames in stdio mode, so logs always go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json || config.logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;
    config.validate()?;

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    if let Commands::Config {
        command: ConfigCommands::Show,
    } = &cli.command
    {
        match format {
            OutputFormat::Json => print_json(&config)?,
            _ => print!("{}", config.to_toml_string()?),
        }
        return Ok(());
    }

    let search = Arc::new(UnifiedSearch::from_config(&config).await);

    match cli.command {
        Commands::Serve { http } => {
            let server = McpServer::new(search)?;
            match http {
                Some(addr) => {
                    let (bound_addr, handle) = server.run_http(&addr).await?;
                    tracing::info!("MCP server listening on {}", bound_addr);
                    tokio::select! {
                        joined = handle => {
                            joined.map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
                        }
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Shutting down MCP server");
                        }
                    }
                }
                None => server.run().await?,
            }
        }

        Commands::Search {
            query,
            sources,
            num_results,
            author,
            year_start,
            year_end,
            language,
            safe_search,
            duration,
            upload_date,
            sort,
        } => {
            let filters = build_filters(
                author,
                year_start,
                year_end,
                language,
                safe_search,
                duration,
                upload_date,
                sort,
            );
            let request = SearchRequest::new(query)
                .sources(sources.into_iter().map(SourceKind::from))
                .num_results(num_results.unwrap_or(config.search.default_num_results))
                .filters(filters);

            let response = search.search(request).await?;

            match format {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Plain => {
                    for (kind, results) in response.results() {
                        for result in results {
                            println!("[{}] {}", kind, result.title());
                            println!("  {}", result.url());
                            if !result.snippet().is_empty() {
                                println!("  {}", ui::truncate_with_ellipsis(result.snippet(), 200));
                            }
                            println!();
                        }
                    }
                    for (kind, error) in response.errors() {
                        eprintln!("[{}] error: {}", kind, error);
                    }
                }
                _ => {
                    if !cli.quiet {
                        ui::print_search_header(
                            response.query(),
                            response.total_results(),
                            response.search_time(),
                            response.metadata().cache_hit,
                        );
                    }
                    println!("{}", ui::results_table(&response));
                    if !cli.quiet {
                        for kind in &response.metadata().unavailable_sources {
                            ui::print_status(
                                Status::Warning,
                                &format!("{} is not configured", kind.name()),
                            );
                        }
                    }
                }
            }
        }

        Commands::Author { name } => {
            let profile = search.author_info(&name).await?;
            match format {
                OutputFormat::Json => print_json(&profile)?,
                OutputFormat::Plain => {
                    println!("{}", profile.name);
                    if let Some(affiliation) = &profile.affiliation {
                        println!("  {}", affiliation);
                    }
                    if !profile.interests.is_empty() {
                        println!("  Interests: {}", profile.interests.join(", "));
                    }
                    if let Some(cited_by) = profile.cited_by {
                        println!("  Cited by: {}", cited_by);
                    }
                }
                _ => println!("{}", ui::author_table(&profile)),
            }
        }

        Commands::Stats => {
            let stats = search.get_api_usage_stats().await;
            match format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Plain => {
                    for (kind, usage) in &stats.usage.providers {
                        println!(
                            "{}: {} calls today, {} errors, remaining {}",
                            kind,
                            usage.calls_today,
                            usage.errors_today,
                            usage
                                .remaining
                                .map_or("unlimited".to_string(), |n| n.to_string())
                        );
                    }
                    println!(
                        "cache: {} hits, {} misses ({:.1}%)",
                        stats.cache.hits,
                        stats.cache.misses,
                        stats.cache.hit_rate * 100.0
                    );
                }
                _ => {
                    ui::print_section("API usage");
                    println!("{}", ui::usage_table(&stats));
                    println!("Quotas reset at {}", stats.usage.reset_time.to_rfc3339());
                    ui::print_section("Cache");
                    println!("{}", ui::cache_table(&stats));
                }
            }
        }

        Commands::Status { probe } => {
            let status = search.get_service_status(probe).await;
            match format {
                OutputFormat::Json => print_json(&status)?,
                OutputFormat::Plain => {
                    println!("{}", status.status);
                    for source in &status.sources {
                        println!("{}: {}", source.source, source.status);
                    }
                    println!("cache: {}", status.cache.status);
                }
                _ => {
                    ui::print_overall_status(&status);
                    println!("{}", ui::status_table(&status));
                }
            }
        }

        Commands::Cache {
            command: CacheCommands::Clear { source },
        } => {
            let source = source.map(SourceKind::from);
            let cleared = search.clear_cache(source).await;
            let scope = source.map_or("all sources", |k| k.name());
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "cleared": cleared,
                    "source": source.map_or("all", |k| k.id()),
                }))?,
                _ => {
                    if !cli.quiet {
                        ui::print_status(
                            Status::Success,
                            &format!("Cleared {} cached entries for {}", cleared, scope),
                        );
                    }
                }
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["unified-search", "stats"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.log_json);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["unified-search", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["unified-search", "status", "--probe", "-q"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Status { probe: true }));
    }

    #[test]
    fn test_cli_output_format() {
        let cli = Cli::parse_from(["unified-search", "-o", "json", "stats"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.output.resolve(), OutputFormat::Json);

        let cli = Cli::parse_from(["unified-search", "stats", "--output", "plain"]);
        assert_eq!(cli.output, OutputFormat::Plain);
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from(["unified-search", "search", "machine learning"]);
        match cli.command {
            Commands::Search {
                query,
                sources,
                num_results,
                ..
            } => {
                assert_eq!(query, "machine learning");
                assert!(sources.is_empty());
                assert_eq!(num_results, None);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_with_options() {
        let cli = Cli::parse_from([
            "unified-search",
            "search",
            "neural networks",
            "--sources",
            "academic,video",
            "-n",
            "5",
            "--year-start",
            "2018",
            "--sort",
            "view-count",
        ]);
        match cli.command {
            Commands::Search {
                sources,
                num_results,
                year_start,
                sort,
                ..
            } => {
                assert_eq!(sources, vec![SourceArg::Academic, SourceArg::Video]);
                assert_eq!(num_results, Some(5));
                assert_eq!(year_start, Some(2018));
                assert_eq!(sort, Some(SortArg::ViewCount));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_build_filters() {
        let filters = build_filters(
            Some("Hinton".to_string()),
            Some(2010),
            None,
            Some("de".to_string()),
            Some(SafeSearchArg::Off),
            Some(DurationArg::Short),
            Some(UploadDateArg::Week),
            None,
        );
        assert_eq!(filters.academic.author.as_deref(), Some("Hinton"));
        assert_eq!(filters.web.language, "de");
        assert_eq!(filters.web.safe_search, SafeSearch::Off);
        assert_eq!(filters.video.duration, Some(VideoDuration::Short));
        assert_eq!(filters.video.upload_date, Some(UploadDate::Week));
        assert_eq!(filters.video.sort, VideoSort::Relevance);
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["unified-search", "serve"]);
        assert!(matches!(cli.command, Commands::Serve { http: None }));

        let cli = Cli::parse_from(["unified-search", "serve", "--http", "127.0.0.1:3000"]);
        match cli.command {
            Commands::Serve { http } => assert_eq!(http.as_deref(), Some("127.0.0.1:3000")),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_cache_clear() {
        let cli = Cli::parse_from(["unified-search", "cache", "clear", "--source", "web"]);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                command: CacheCommands::Clear {
                    source: Some(SourceArg::Web)
                }
            }
        ));
    }

    #[test]
    fn test_cli_config_show() {
        let cli = Cli::parse_from(["unified-search", "config", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show
            }
        ));
    }
}
