//! opsift: search directories of packet captures for an opcode.
//!
//! This is the main entry point for the CLI application.

use opsift::core::config::Config;
use opsift::core::error::Result;
use opsift::core::types::{format_opcode, SearchRequest, SearchSummary};
use opsift::scanner::{ConsoleProgressReporter, JsonLinesSource, SearchCoordinator};
use opsift::ui::cli::{Cli, Commands, ConfigAction, OutputFormat};
use opsift::ui::report::{generate_report, ReportFormat};
use opsift::utils::logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::from_config(&config)
    };
    init_logging(log_config)?;

    log::debug!("opsift v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Scan {
            root,
            opcode,
            extensions,
            census,
            game_events,
            workers,
            interval_ms,
            output,
        }) => {
            let mut config = config;
            if !extensions.is_empty() {
                config.scan.file_extensions = extensions;
            }
            if census {
                config.inspect.message_census = true;
            }
            config.inspect.game_events.extend(game_events);
            if let Some(workers) = workers {
                config.scan.worker_threads = workers;
            }
            if let Some(interval_ms) = interval_ms {
                config.scan.report_interval_ms = interval_ms;
            }
            config.validate()?;

            let request = SearchRequest::new(root, &config.scan.file_extensions, opcode);
            let summary = run_scan(Arc::new(config), request, cli.quiet).await?;
            print_summary(&summary, cli.format)?;

            if let Some(path) = output {
                generate_report(&summary, ReportFormat::from_path(&path), &path)?;
                log::info!("Summary written to {:?}", path);
            }
            Ok(())
        }
        Some(Commands::Config { action }) => run_config(action, &config, cli.config),
        Some(Commands::Info) => run_info(&config),
        None => {
            println!("opsift - opcode search across packet captures");
            println!();
            println!("Use --help for usage information");
            println!();
            println!("Quick start:");
            println!("  opsift scan ./captures --opcode F7B0");
            println!("  opsift scan ./dumps --opcode 0x02BB --ext jsonl --census");
            Ok(())
        }
    }
}

/// Run one search, stopping it on Ctrl-C.
async fn run_scan(config: Arc<Config>, request: SearchRequest, quiet: bool) -> Result<SearchSummary> {
    let mut console = ConsoleProgressReporter::new(request.target_opcode);
    if quiet {
        console = console.quiet();
    }

    let coordinator = Arc::new(
        SearchCoordinator::new(config, Arc::new(JsonLinesSource::new())).with_sink(console),
    );
    coordinator.start(request).await?;

    let interrupt = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!();
                log::warn!("Interrupted; stopping search");
                coordinator.stop();
            }
        })
    };

    let summary = coordinator.wait().await;
    interrupt.abort();
    summary
}

fn print_summary(summary: &SearchSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Text => {
            eprintln!();
            println!();
            println!("=== Search Complete ===");
            println!("Search ID:        {}", summary.search_id);
            println!("Opcode:           {}", format_opcode(summary.request.target_opcode));
            println!("Status:           {:?}", summary.status);
            println!(
                "Files Processed:  {} of {}",
                summary.files_processed, summary.files_total
            );
            if summary.files_skipped > 0 {
                println!("Files Skipped:    {}", summary.files_skipped);
            }
            println!("Matching Files:   {}", summary.outcomes.len());
            println!("Total Hits:       {}", summary.total_hits());
            println!("Special Markers:  {}", summary.special_hits.len());
            if let Some(duration) = summary.duration_ms() {
                println!("Duration:         {} ms", duration);
            }
        }
    }
    Ok(())
}

/// Handle configuration commands.
fn run_config(action: ConfigAction, config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(Config::default_config_path);
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Reset => {
            log::info!("Resetting configuration to defaults...");
            Config::default().save(&path)?;
            println!("Configuration reset to defaults.");
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Show application information.
fn run_info(config: &Config) -> Result<()> {
    println!("opsift - opcode search across packet captures");
    println!();
    println!("Version:          {}", env!("CARGO_PKG_VERSION"));
    println!("Config Path:      {}", Config::default_config_path().display());
    println!("Data Directory:   {}", Config::data_dir().display());
    println!();
    println!("Scan Settings:");
    println!("  Extensions:     {}", config.scan.file_extensions.join(", "));
    println!("  Workers:        {}", config.scan.workers());
    println!("  Report Every:   {} ms", config.scan.report_interval_ms);
    println!("  Symlinks:       {}", config.scan.follow_symlinks);
    println!();
    println!("Inspectors:");
    println!("  Census:         {}", config.inspect.message_census);
    let events: Vec<String> = config
        .inspect
        .game_events
        .iter()
        .map(|e| format_opcode(*e))
        .collect();
    println!("  Game Events:    {}", events.join(", "));
    Ok(())
}
