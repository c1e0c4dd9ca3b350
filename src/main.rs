use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lucky_search::config::{find_config_file, get_config, load_config, Config};
use lucky_search::models::{Article, Filters, MultiValue, SearchRequest, SearchResponse};
use lucky_search::{Aggregator, SourceRegistry};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Lucky Search - Search scholarly metadata across OpenAlex and Crossref
#[derive(Parser, Debug)]
#[command(name = "lucky-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search scholarly metadata across OpenAlex and Crossref", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every enabled source
    #[command(alias = "s")]
    Search(SearchArgs),

    /// List enabled sources in the order they are queried
    Sources,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Free-text query
    query: Option<String>,

    /// Author names, comma-separated
    #[arg(long)]
    authors: Option<String>,

    /// Journal title
    #[arg(long)]
    journal: Option<String>,

    /// Journal ISSN
    #[arg(long)]
    issn: Option<String>,

    /// Article title
    #[arg(long)]
    title: Option<String>,

    /// Full-text search terms
    #[arg(long)]
    text: Option<String>,

    /// Abstract search terms
    #[arg(long = "abstract")]
    abstract_terms: Option<String>,

    /// Author affiliation
    #[arg(long)]
    affiliation: Option<String>,

    /// Earliest publication year
    #[arg(long)]
    year_from: Option<i32>,

    /// Latest publication year
    #[arg(long)]
    year_to: Option<i32>,

    /// Exact number of authors
    #[arg(long)]
    authors_count: Option<u32>,

    /// Collaboration country code (repeatable, at most 4)
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Page number
    #[arg(long)]
    page: Option<u32>,

    /// Records per upstream request
    #[arg(long)]
    page_size: Option<u32>,

    /// Maximum results per source
    #[arg(long, short)]
    max_results: Option<usize>,

    /// Read the full request as JSON from a file, or `-` for stdin
    #[arg(long, conflicts_with_all = [
        "query", "authors", "journal", "issn", "title", "text", "abstract_terms", "affiliation",
        "year_from", "year_to", "authors_count", "countries", "page", "page_size", "max_results",
    ])]
    request: Option<PathBuf>,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

impl SearchArgs {
    /// Build the canonical request from flags, falling back to config defaults
    fn to_request(&self, config: &Config) -> SearchRequest {
        let filters = Filters {
            authors: self.authors.clone().map(Into::into),
            journal_title: self.journal.clone().map(Into::into),
            issn: self.issn.clone().map(Into::into),
            article_title: self.title.clone().map(Into::into),
            article_text: self.text.clone().map(Into::into),
            r#abstract: self.abstract_terms.clone().map(Into::into),
            affiliation: self.affiliation.clone().map(Into::into),
            year_from: self.year_from,
            year_to: self.year_to,
            authors_count: self.authors_count,
            collaboration_countries: (!self.countries.is_empty())
                .then(|| MultiValue::List(self.countries.clone())),
        };

        SearchRequest::new(self.query.clone().unwrap_or_default())
            .filters(filters)
            .page(self.page.unwrap_or(1))
            .page_size(self.page_size.unwrap_or(config.search.default_page_size))
            .max_results(self.max_results.unwrap_or(config.search.default_max_results))
    }
}

/// Read a JSON request body from a file or stdin
fn read_request(path: &Path) -> Result<SearchRequest> {
    let body = if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request from stdin")?;
        body
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?
    };

    serde_json::from_str(&body).context("Invalid search request JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        load_config(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        get_config()?
    };

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lucky_search={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(config_path) = cli.config.clone().or_else(find_config_file) {
        tracing::debug!("Using config file: {}", config_path.display());
    }

    match cli.command {
        Commands::Search(args) => {
            let request = match &args.request {
                Some(path) => read_request(path)?,
                None => args.to_request(&config),
            };

            let registry = SourceRegistry::from_config(&config)?;
            let aggregator = Aggregator::new(Arc::new(registry));
            let response = aggregator.search(&request).await?;

            output_response(&response, args.output)?;
        }
        Commands::Sources => {
            let registry = SourceRegistry::from_config(&config)?;
            for source in registry.all() {
                let filters: Vec<&str> =
                    source.field_mapping().keys().map(|k| k.as_str()).collect();
                println!(
                    "{:<10} {:<10} {}",
                    source.id(),
                    source.name(),
                    filters.join(", ")
                );
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Shorten a string to at most `max` characters
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn authors_cell(article: &Article) -> String {
    let names: Vec<String> = article.authors.iter().map(|a| a.full_name()).collect();
    truncate(&names.join(", "), 30)
}

fn output_response(response: &SearchResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Title", "Authors", "Journal", "Year", "Cited", "DOI"]);

            for article in &response.articles {
                let year = if article.year > 0 {
                    article.year.to_string()
                } else {
                    String::new()
                };

                table.add_row(vec![
                    Cell::new(truncate(&article.title, 50)).add_attribute(Attribute::Bold),
                    Cell::new(authors_cell(article)),
                    Cell::new(truncate(&article.journal_full, 30)),
                    Cell::new(year),
                    Cell::new(article.citations),
                    Cell::new(&article.doi),
                ]);
            }
            println!("{table}");
            eprintln!(
                "{} results in {:.0} ms",
                response.total_results, response.search_time_ms
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_flags_to_request() {
        let cli = Cli::parse_from([
            "lucky-search",
            "search",
            "graphene",
            "--authors",
            "Geim, Novoselov",
            "--year-from",
            "2004",
            "--country",
            "GB",
            "--country",
            "RU",
            "--page-size",
            "50",
        ]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };

        let request = args.to_request(&Config::default());
        assert_eq!(request.query, "graphene");
        assert_eq!(request.filters.authors, Some("Geim, Novoselov".into()));
        assert_eq!(request.filters.year_from, Some(2004));
        assert_eq!(
            request.filters.collaboration_countries,
            Some(MultiValue::List(vec!["GB".to_string(), "RU".to_string()]))
        );
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 50);
        assert_eq!(request.max_results, 100);
        assert_eq!(args.output, OutputFormat::Table);
    }

    #[test]
    fn test_no_countries_means_no_filter() {
        let cli = Cli::parse_from(["lucky-search", "search", "q", "-o", "json"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.to_request(&Config::default()).filters, Filters::default());
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn test_request_file_excludes_search_flags() {
        let extra: [&[&str]; 5] = [
            &["--authors", "Geim"],
            &["--country", "RU"],
            &["--year-from", "2004"],
            &["--page-size", "50"],
            &["graphene"],
        ];
        for flag in extra {
            let mut argv = vec!["lucky-search", "search", "--request", "request.json"];
            argv.extend_from_slice(flag);
            let err = Cli::try_parse_from(argv).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }

        assert!(Cli::try_parse_from([
            "lucky-search",
            "search",
            "--request",
            "request.json",
            "-o",
            "json"
        ])
        .is_ok());
    }

    #[test]
    fn test_read_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, r#"{"query": "Math", "filters": null, "page_size": 5}"#).unwrap();

        let request = read_request(&path).unwrap();
        assert_eq!(request.query, "Math");
        assert_eq!(request.page_size, 5);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
