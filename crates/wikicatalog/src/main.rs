use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use wikicatalog_core::config::{CatalogConfig, load_config};
use wikicatalog_core::ingest::{CatalogProfile, IngestOptions, IngestReport, run_ingest};
use wikicatalog_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, init_layout, inspect_runtime,
    normalize_for_display, resolve_paths,
};
use wikicatalog_core::store::{Catalog, CatalogStore};
use wikicatalog_core::wiki::{MediaWikiClient, MediaWikiClientConfig};

const DEFAULT_LOG_FILTER: &str = "wikicatalog=info,wikicatalog_core=info,tower_http=info";

#[derive(Debug, Parser)]
#[command(
    name = "wikicatalog",
    version,
    about = "Scrape item and character catalogs from a MediaWiki and serve them as JSON"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "SQLite database file")]
    db: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            db: cli.db.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create the state directory, config file and database schema")]
    Init(InitArgs),
    #[command(about = "Scrape a category from the wiki into the catalog")]
    Ingest(IngestArgs),
    #[command(about = "Serve the read-only JSON API")]
    Serve(ServeArgs),
    #[command(about = "Print every entry of a catalog as JSON")]
    List(ListArgs),
    #[command(about = "Print one entry of a catalog as JSON")]
    Show(ShowArgs),
    #[command(about = "Show resolved paths and row counts")]
    Status,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IngestTarget {
    Items,
    Characters,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
struct IngestArgs {
    #[arg(value_enum)]
    target: IngestTarget,
    #[arg(short = 'c', long, value_name = "NAME", help = "Override the wiki category")]
    category: Option<String>,
    #[arg(long, value_name = "N", help = "Override the category listing limit")]
    limit: Option<usize>,
    #[arg(long, help = "Record per-page network failures and continue")]
    isolate_errors: bool,
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(value_parser = parse_catalog)]
    catalog: Catalog,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[arg(value_parser = parse_catalog)]
    catalog: Catalog,
    id: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);
    init_tracing();

    match cli.command {
        Some(Commands::Init(args)) => run_init(&runtime, args),
        Some(Commands::Ingest(args)) => run_ingest_command(&runtime, args),
        Some(Commands::Serve(args)) => run_serve(&runtime, args),
        Some(Commands::List(args)) => run_list(&runtime, args),
        Some(Commands::Show(args)) => run_show(&runtime, args),
        Some(Commands::Status) => run_status(&runtime),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = init_layout(&paths, args.force)?;

    println!("Initialized wikicatalog runtime layout");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("state_dir: {}", normalize_for_display(&paths.state_dir));
    println!("db_path: {}", normalize_for_display(&paths.db_path));
    println!("config_path: {}", normalize_for_display(&paths.config_path));
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", report.wrote_config);
    println!("created_db: {}", report.created_db);
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_ingest_command(runtime: &RuntimeOptions, args: IngestArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let config = load_runtime_config(&paths)?;
    let catalogs = match args.target {
        IngestTarget::Items => vec![Catalog::Items],
        IngestTarget::Characters => vec![Catalog::Characters],
        IngestTarget::All => {
            if args.category.is_some() || args.limit.is_some() {
                bail!("--category and --limit apply to a single catalog, not `all`");
            }
            Catalog::ALL.to_vec()
        }
    };

    let store = CatalogStore::open(&paths.db_path)?;
    let mut client = MediaWikiClient::new(MediaWikiClientConfig::from_config(&config))?;
    let options = IngestOptions {
        isolate_fetch_errors: args.isolate_errors,
    };

    let mut reports = Vec::new();
    for catalog in catalogs {
        let mut profile = CatalogProfile::from_config(catalog, &config);
        if let Some(category) = &args.category {
            profile.category = category.clone();
        }
        if let Some(limit) = args.limit {
            profile.limit = limit;
        }
        let report = run_ingest(&mut client, &store, &profile, &options)
            .with_context(|| format!("{} ingest aborted", catalog.as_str()))?;
        reports.push(report);
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                print_ingest_report(report);
            }
        }
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_serve(runtime: &RuntimeOptions, args: ServeArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let config = load_runtime_config(&paths)?;
    let host = args.host.unwrap_or_else(|| config.host());
    let port = args.port.unwrap_or_else(|| config.port());
    let store = CatalogStore::open(&paths.db_path)?;
    print_diagnostics(runtime, &paths);

    let server_runtime =
        tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    server_runtime.block_on(wikicatalog_core::api::serve(store, &host, port))
}

fn run_list(runtime: &RuntimeOptions, args: ListArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let store = CatalogStore::open(&paths.db_path)?;
    let entries = store
        .list_all(args.catalog)?
        .iter()
        .map(|entry| entry.to_json(args.catalog))
        .collect::<Vec<_>>();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn run_show(runtime: &RuntimeOptions, args: ShowArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let store = CatalogStore::open(&paths.db_path)?;
    let Some(entry) = store.find_by_id(args.catalog, args.id)? else {
        bail!("no {} entry with id {}", args.catalog.as_str(), args.id);
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&entry.to_json(args.catalog))?
    );
    Ok(())
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let status = inspect_runtime(&paths)?;

    println!("runtime status");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("state_dir_exists: {}", format_flag(status.state_dir_exists));
    println!("config_exists: {}", format_flag(status.config_exists));
    println!("db_exists: {}", format_flag(status.db_exists));
    println!(
        "db_size_bytes: {}",
        status
            .db_size_bytes
            .map(|size| size.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    if status.db_exists {
        let store = CatalogStore::open(&paths.db_path)?;
        for catalog in Catalog::ALL {
            println!("{}: {}", catalog.as_str(), store.count(catalog)?);
        }
    }
    if !status.warnings.is_empty() {
        println!("warnings:");
        for warning in &status.warnings {
            println!("  - {warning}");
        }
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn print_ingest_report(report: &IngestReport) {
    println!("{} ingest ({})", report.catalog.as_str(), report.category);
    println!("listed: {}", report.listed);
    println!("added: {}", report.added);
    println!("skipped: {}", report.skipped);
    println!("failed: {}", report.failed);
    println!("requests: {}", report.request_count);
    for outcome in &report.outcomes {
        match &outcome.detail {
            Some(detail) => println!("  {:?} {} ({detail})", outcome.action, outcome.title),
            None => println!("  {:?} {}", outcome.action, outcome.title),
        }
    }
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn load_runtime_config(paths: &ResolvedPaths) -> Result<CatalogConfig> {
    load_config(&paths.config_path)
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        db_path: runtime.db.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}

fn parse_catalog(value: &str) -> Result<Catalog> {
    Catalog::parse(value)
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
