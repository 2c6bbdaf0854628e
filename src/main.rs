use anyhow::Result;
use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use historical_search::config::{find_config_file, get_config, load_config};
use historical_search::models::{
    AggregatedResult, QueryRequest, RecordKind, ResultEnvelope, SnapshotReference,
};
use historical_search::orchestrator::Orchestrator;
use historical_search::sources::{
    CdxMatchType, CdxOptions, CdxOutput, ChroniclingAmericaOptions, EventQuery, GuardianOptions,
    NytOptions, NytSort, Source, SourceSet, WaybackFallback,
};
use historical_search::utils::{walk, PagedSource};
use serde::Serialize;
use serde_json::Value;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Historical Search - Search web archives, newspapers and news APIs by year range
#[derive(Parser, Debug)]
#[command(name = "historical-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search historical news and documents across archives and news APIs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for progress and debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

/// CDX response format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CaptureFormat {
    Json,
    Cdx,
    Csv,
}

impl From<CaptureFormat> for CdxOutput {
    fn from(format: CaptureFormat) -> Self {
        match format {
            CaptureFormat::Json => CdxOutput::Json,
            CaptureFormat::Cdx => CdxOutput::Cdx,
            CaptureFormat::Csv => CdxOutput::Csv,
        }
    }
}

/// CDX URL matching mode
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Prefix,
    Host,
    Domain,
}

impl From<MatchMode> for CdxMatchType {
    fn from(mode: MatchMode) -> Self {
        match mode {
            MatchMode::Exact => CdxMatchType::Exact,
            MatchMode::Prefix => CdxMatchType::Prefix,
            MatchMode::Host => CdxMatchType::Host,
            MatchMode::Domain => CdxMatchType::Domain,
        }
    }
}

/// NYT result ordering
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    Newest,
    Oldest,
    Relevance,
}

impl From<SortArg> for NytSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Newest => NytSort::Newest,
            SortArg::Oldest => NytSort::Oldest,
            SortArg::Relevance => NytSort::Relevance,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every eligible source for a query
    #[command(alias = "s")]
    Search {
        /// Search text (for the archive index, a domain)
        query: String,

        /// First year of the range
        #[arg(long)]
        from: i32,

        /// Last year of the range (default: current year)
        #[arg(long)]
        to: Option<i32>,

        /// Sources to include (cdx, ca, nyt, guardian, gdelt); default picks by date
        #[arg(long = "source", short, value_delimiter = ',')]
        sources: Vec<String>,
    },

    /// List Wayback Machine captures of a URL or domain
    Captures {
        /// URL or domain
        url: String,

        #[arg(long)]
        from: i32,

        #[arg(long)]
        to: Option<i32>,

        /// CDX response format (cdx and csv are printed raw)
        #[arg(long, value_enum, default_value_t = CaptureFormat::Json)]
        format: CaptureFormat,

        /// URL matching mode
        #[arg(long = "match", value_enum, default_value_t = MatchMode::Domain)]
        match_type: MatchMode,

        /// Comma-separated field list, e.g. timestamp,statuscode
        #[arg(long)]
        fields: Option<String>,

        /// Keep only captures with this HTTP status
        #[arg(long, default_value = "200")]
        status: String,

        /// Keep captures of every status
        #[arg(long, conflicts_with = "status")]
        any_status: bool,

        /// Maximum number of captures
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Search digitized US newspapers (1690-1963)
    Newspapers {
        query: String,

        #[arg(long)]
        from: i32,

        #[arg(long)]
        to: Option<i32>,

        /// US state name
        #[arg(long)]
        state: Option<String>,

        /// Language code
        #[arg(long, default_value = "eng")]
        language: String,

        /// Results per page
        #[arg(long)]
        rows: Option<u32>,

        /// Result page (1-based)
        #[arg(long)]
        page: Option<u32>,
    },

    /// Search New York Times articles
    Nyt {
        query: String,

        #[arg(long)]
        from: i32,

        #[arg(long)]
        to: Option<i32>,

        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,

        /// Filter query
        #[arg(long)]
        fq: Option<String>,

        /// Result page (0-based), ignored with --all
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Walk every page
        #[arg(long)]
        all: bool,

        /// Stop walking after this many articles
        #[arg(long, requires = "all")]
        max_results: Option<usize>,
    },

    /// Search Guardian articles (1999-present)
    Guardian {
        query: String,

        #[arg(long)]
        from: i32,

        #[arg(long)]
        to: Option<i32>,

        /// Section id, e.g. world
        #[arg(long)]
        section: Option<String>,

        /// newest, oldest or relevance
        #[arg(long)]
        order_by: Option<String>,

        /// Result page (1-based), ignored with --all
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 50)]
        page_size: u32,

        /// Walk every page
        #[arg(long)]
        all: bool,

        /// Stop walking after this many articles
        #[arg(long, requires = "all")]
        max_results: Option<usize>,
    },

    /// Query GDELT events through BigQuery
    Events {
        #[arg(long)]
        from: i32,

        #[arg(long)]
        to: Option<i32>,

        /// CAMEO event code (repeatable)
        #[arg(long = "code")]
        codes: Vec<String>,

        /// Actor1 country code, e.g. USA
        #[arg(long)]
        country: Option<String>,

        #[arg(long, default_value_t = 100_000)]
        limit: u64,
    },

    /// Print the Wayback address of the capture nearest a day
    Snapshot {
        url: String,

        year: i32,

        #[arg(long, default_value_t = 6)]
        month: u32,

        #[arg(long, default_value_t = 15)]
        day: u32,
    },

    /// Ask the availability API for the capture closest to a year
    Available { url: String, year: i32 },

    /// List sources, their coverage and whether they are configured
    Sources,
}

const NEWSPAPER_COLUMNS: &[&str] = &["date", "title", "city", "id"];
const NYT_COLUMNS: &[&str] = &["pub_date", "headline.main", "web_url"];
const GUARDIAN_COLUMNS: &[&str] = &["webPublicationDate", "webTitle", "sectionName"];
const EVENT_COLUMNS: &[&str] = &["SQLDATE", "Actor1Name", "Actor2Name", "EventCode"];
const CAPTURE_COLUMNS: &[&str] = &["timestamp", "original", "statuscode"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => get_config()?,
    };

    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("historical_search={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    if let Some(secs) = cli.timeout {
        config.timeouts.search_secs = secs;
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    let format = resolve_format(cli.output);

    match cli.command {
        Commands::Search {
            query,
            from,
            to,
            sources,
        } => {
            let request = build_request(&query, from, to)?;
            let include = if sources.is_empty() {
                None
            } else {
                Some(SourceSet::parse_list(&sources.join(","))?)
            };

            let result = orchestrator
                .comprehensive_search(
                    &request.text,
                    request.start_year,
                    request.end_year,
                    include,
                    cli.verbose > 0,
                )
                .await;
            output_aggregate(&result, format)?;
        }

        Commands::Captures {
            url,
            from,
            to,
            format: capture_format,
            match_type,
            fields,
            status,
            any_status,
            limit,
        } => {
            let request = build_request(&url, from, to)?;
            let options = CdxOptions {
                output: capture_format.into(),
                filter_status: (!any_status).then_some(status),
                match_type: match_type.into(),
                fields,
                limit,
                ..Default::default()
            };

            let archive = orchestrator.archive();
            let envelope = archive.query(&request, &options).await;
            let columns: Vec<String> = match &envelope.columns {
                Some(columns) if !columns.is_empty() => columns.clone(),
                _ => CAPTURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            };
            output_envelope(archive.name(), &envelope, &columns, format)?;
        }

        Commands::Newspapers {
            query,
            from,
            to,
            state,
            language,
            rows,
            page,
        } => {
            let request = build_request(&query, from, to)?;
            let options = ChroniclingAmericaOptions {
                state,
                language: Some(language),
                rows,
                page,
                ..Default::default()
            };

            let newspapers = orchestrator.newspapers();
            let envelope = newspapers.query(&request, &options).await;
            output_envelope(newspapers.name(), &envelope, &owned(NEWSPAPER_COLUMNS), format)?;
        }

        Commands::Nyt {
            query,
            from,
            to,
            sort,
            fq,
            page,
            all,
            max_results,
        } => {
            let nyt = orchestrator.nyt().ok_or_else(|| {
                anyhow::anyhow!("NYT API key not configured (set NYT_API_KEY or [api_keys] nyt)")
            })?;
            let request = build_request(&query, from, to)?;
            let options = NytOptions {
                sort: sort.into(),
                fq,
                page,
            };

            let envelope = if all {
                let walked = walk(nyt, &request, max_results, &options).await;
                tracing::debug!(pages = walked.pages_fetched, stop = ?walked.stop, "NYT walk finished");
                walked.into_envelope(RecordKind::Articles, nyt.first_page())
            } else {
                nyt.query(&request, &options).await
            };
            output_envelope(nyt.name(), &envelope, &owned(NYT_COLUMNS), format)?;
        }

        Commands::Guardian {
            query,
            from,
            to,
            section,
            order_by,
            page,
            page_size,
            all,
            max_results,
        } => {
            let guardian = orchestrator.guardian().ok_or_else(|| {
                anyhow::anyhow!(
                    "Guardian API key not configured (set GUARDIAN_API_KEY or [api_keys] guardian)"
                )
            })?;
            let request = build_request(&query, from, to)?;
            let options = GuardianOptions {
                page,
                page_size,
                section,
                order_by,
                show_fields: None,
            };

            let envelope = if all {
                let walked = walk(guardian, &request, max_results, &options).await;
                tracing::debug!(pages = walked.pages_fetched, stop = ?walked.stop, "Guardian walk finished");
                walked.into_envelope(RecordKind::Articles, guardian.first_page())
            } else {
                guardian.query(&request, &options).await
            };
            output_envelope(guardian.name(), &envelope, &owned(GUARDIAN_COLUMNS), format)?;
        }

        Commands::Events {
            from,
            to,
            codes,
            country,
            limit,
        } => {
            let events = orchestrator.events().ok_or_else(|| {
                anyhow::anyhow!(
                    "GDELT warehouse not configured (set GDELT_PROJECT_ID and GDELT_ACCESS_TOKEN)"
                )
            })?;
            let to = to.unwrap_or_else(current_year);
            if from > to {
                anyhow::bail!("start year {} is after end year {}", from, to);
            }
            let query = EventQuery {
                event_codes: codes,
                actor_country: country,
                limit,
            };

            let envelope = events.query(&QueryRequest::new("", from, to), &query).await;
            output_envelope(events.name(), &envelope, &owned(EVENT_COLUMNS), format)?;
        }

        Commands::Snapshot {
            url,
            year,
            month,
            day,
        } => {
            let snapshot_url = WaybackFallback::closest_snapshot_url_on(&url, year, month, day);
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "url": snapshot_url }))?,
                _ => println!("{}", snapshot_url),
            }
        }

        Commands::Available { url, year } => {
            let snapshot = orchestrator.fallback().check_availability(&url, year).await;
            output_snapshot(&snapshot, format)?;
        }

        Commands::Sources => {
            output_sources(&orchestrator, format)?;
        }
    }

    Ok(())
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn build_request(text: &str, from: i32, to: Option<i32>) -> Result<QueryRequest> {
    let request = QueryRequest::new(text, from, to.unwrap_or_else(current_year));
    request.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(request)
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Value at a dotted path inside a record, as display text
fn field(record: &Value, path: &str) -> String {
    match path.split('.').try_fold(record, |value, key| value.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn envelope_status(envelope: &ResultEnvelope) -> (String, String) {
    if !envelope.success {
        return (
            "failed".to_string(),
            envelope.error.clone().unwrap_or_default(),
        );
    }
    if let Some(raw) = &envelope.raw {
        return ("raw".to_string(), format!("{} bytes", raw.len()));
    }
    ("ok".to_string(), String::new())
}

fn output_aggregate(result: &AggregatedResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result)?,
        OutputFormat::Plain => {
            println!("{} ({})", result.query, result.date_range);
            for (name, envelope) in &result.sources {
                let (status, detail) = envelope_status(envelope);
                println!(
                    "  {}: {} {} records, {} total {}",
                    name,
                    status,
                    envelope.len(),
                    envelope.total,
                    detail
                );
            }
            println!("Total articles: {}", result.total_articles);
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Source", "Kind", "Status", "Records", "Total", "Detail"]);

            for (name, envelope) in &result.sources {
                let (status, detail) = envelope_status(envelope);
                table.add_row(vec![
                    Cell::new(name).add_attribute(Attribute::Bold),
                    Cell::new(envelope.kind.to_string()),
                    Cell::new(status),
                    Cell::new(envelope.len()),
                    Cell::new(envelope.total),
                    Cell::new(truncate(&detail, 60)),
                ]);
            }
            println!("{table}");
            println!(
                "{} ({}): {} articles",
                result.query, result.date_range, result.total_articles
            );
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

fn output_envelope(
    source: &str,
    envelope: &ResultEnvelope,
    columns: &[String],
    format: OutputFormat,
) -> Result<()> {
    if !envelope.success {
        anyhow::bail!(
            "{} query failed: {}",
            source,
            envelope.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(raw) = &envelope.raw {
        println!("{}", raw);
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(envelope)?,
        OutputFormat::Plain => {
            for record in &envelope.records {
                let values: Vec<String> = columns.iter().map(|c| field(record, c)).collect();
                println!("{}", values.join(" | "));
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(columns.to_vec());

            for record in &envelope.records {
                table.add_row(
                    columns
                        .iter()
                        .map(|c| Cell::new(truncate(&field(record, c), 60)))
                        .collect::<Vec<_>>(),
                );
            }
            println!("{table}");
            println!("{}: {} of {} records", source, envelope.len(), envelope.total);
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

fn output_snapshot(snapshot: &SnapshotReference, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(snapshot);
    }

    if snapshot.available {
        let captured = snapshot
            .captured_at()
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| snapshot.timestamp.clone());
        println!("{}", snapshot.url);
        println!(
            "  captured {} (status {})",
            captured,
            snapshot.status.as_deref().unwrap_or("-")
        );
    } else if let Some(error) = &snapshot.error {
        anyhow::bail!("availability check failed: {}", error);
    } else {
        println!("No snapshot available");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SourceRow {
    id: String,
    name: String,
    records: String,
    coverage: String,
    configured: bool,
}

fn source_rows(orchestrator: &Orchestrator) -> Vec<SourceRow> {
    let attached = orchestrator.sources();
    SourceSet::all()
        .iter()
        .map(|flag| match attached.iter().find(|source| source.flag() == flag) {
            Some(source) => SourceRow {
                id: source.id().to_string(),
                name: source.name().to_string(),
                records: source.kind().to_string(),
                coverage: source.coverage().to_string(),
                configured: true,
            },
            None => SourceRow {
                id: flag.key().unwrap_or_default().to_string(),
                name: String::new(),
                records: String::new(),
                coverage: String::new(),
                configured: false,
            },
        })
        .collect()
}

fn output_sources(orchestrator: &Orchestrator, format: OutputFormat) -> Result<()> {
    let rows = source_rows(orchestrator);

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Plain => {
            for row in &rows {
                if row.configured {
                    println!("{} - {} ({}, {})", row.id, row.name, row.records, row.coverage);
                } else {
                    println!("{} - not configured", row.id);
                }
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Id", "Name", "Records", "Coverage", "Configured"]);
            for row in &rows {
                table.add_row(vec![
                    Cell::new(&row.id),
                    Cell::new(&row.name),
                    Cell::new(&row.records),
                    Cell::new(&row.coverage),
                    Cell::new(if row.configured { "yes" } else { "no" }),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["historical-search", "sources"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.config.is_none());
        assert!(cli.timeout.is_none());
        assert!(matches!(cli.command, Commands::Sources));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["historical-search", "-vv", "sources"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::parse_from([
            "historical-search",
            "sources",
            "--output",
            "json",
            "--timeout",
            "20",
            "--config",
            "/tmp/historical-search.toml",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.timeout, Some(20));
        assert_eq!(
            cli.config,
            Some(PathBuf::from("/tmp/historical-search.toml"))
        );
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from([
            "historical-search",
            "search",
            "moon landing",
            "--from",
            "1969",
            "--to",
            "1970",
            "--source",
            "ca,nyt",
            "-s",
            "cdx",
        ]);

        match cli.command {
            Commands::Search {
                query,
                from,
                to,
                sources,
            } => {
                assert_eq!(query, "moon landing");
                assert_eq!(from, 1969);
                assert_eq!(to, Some(1970));
                assert_eq!(sources, vec!["ca", "nyt", "cdx"]);
                let set = SourceSet::parse_list(&sources.join(",")).unwrap();
                assert_eq!(set, SourceSet::NEWSPAPERS | SourceSet::NYT | SourceSet::ARCHIVE);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_captures_command() {
        let cli = Cli::parse_from([
            "historical-search",
            "captures",
            "example.com",
            "--from",
            "2000",
            "--to",
            "2005",
            "--format",
            "csv",
            "--fields",
            "timestamp,statuscode",
            "--any-status",
        ]);

        match cli.command {
            Commands::Captures {
                url,
                format,
                fields,
                any_status,
                match_type,
                ..
            } => {
                assert_eq!(url, "example.com");
                assert_eq!(format, CaptureFormat::Csv);
                assert_eq!(fields.as_deref(), Some("timestamp,statuscode"));
                assert!(any_status);
                assert_eq!(match_type, MatchMode::Domain);
            }
            _ => panic!("Expected Captures command"),
        }
    }

    #[test]
    fn test_cli_nyt_walk_command() {
        let cli = Cli::parse_from([
            "historical-search",
            "nyt",
            "apollo",
            "--from",
            "1969",
            "--all",
            "--max-results",
            "25",
            "--sort",
            "oldest",
        ]);

        match cli.command {
            Commands::Nyt {
                all,
                max_results,
                sort,
                to,
                ..
            } => {
                assert!(all);
                assert_eq!(max_results, Some(25));
                assert_eq!(sort, SortArg::Oldest);
                assert!(to.is_none());
            }
            _ => panic!("Expected Nyt command"),
        }
    }

    #[test]
    fn test_cli_max_results_requires_all() {
        let result = Cli::try_parse_from([
            "historical-search",
            "guardian",
            "election",
            "--from",
            "2004",
            "--max-results",
            "10",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_events_command() {
        let cli = Cli::parse_from([
            "historical-search",
            "events",
            "--from",
            "2001",
            "--to",
            "2001",
            "--code",
            "0211",
            "--code",
            "0311",
            "--country",
            "USA",
        ]);

        match cli.command {
            Commands::Events {
                codes,
                country,
                limit,
                ..
            } => {
                assert_eq!(codes, vec!["0211", "0311"]);
                assert_eq!(country.as_deref(), Some("USA"));
                assert_eq!(limit, 100_000);
            }
            _ => panic!("Expected Events command"),
        }
    }

    #[test]
    fn test_cli_snapshot_defaults() {
        let cli = Cli::parse_from(["historical-search", "snapshot", "cnn.com", "2005"]);
        match cli.command {
            Commands::Snapshot {
                url,
                year,
                month,
                day,
            } => {
                assert_eq!(url, "cnn.com");
                assert_eq!(year, 2005);
                assert_eq!((month, day), (6, 15));
            }
            _ => panic!("Expected Snapshot command"),
        }
    }

    #[test]
    fn test_build_request_defaults_to_current_year() {
        let request = build_request("apollo", 1969, None).unwrap();
        assert_eq!(request.end_year, current_year());
        assert!(build_request("apollo", 1970, Some(1969)).is_err());
        assert!(build_request("  ", 1969, Some(1970)).is_err());
    }

    #[test]
    fn test_field_paths() {
        let record = json!({"headline": {"main": "Men Walk on Moon"}, "word_count": 120, "byline": null});
        assert_eq!(field(&record, "headline.main"), "Men Walk on Moon");
        assert_eq!(field(&record, "word_count"), "120");
        assert_eq!(field(&record, "byline"), "");
        assert_eq!(field(&record, "missing.path"), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer headline", 10), "a longe...");
    }

    #[test]
    fn test_source_rows_without_keys() {
        let orchestrator = Orchestrator::new().unwrap();
        let rows = source_rows(&orchestrator);

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].id, "internet_archive");
        assert_eq!(rows[1].coverage, "1690-1963");
        assert!(rows[1].configured);
        assert!(!rows[2].configured);
        assert_eq!(rows[4].id, "gdelt");
    }
}
