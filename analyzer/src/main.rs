//! Firmware Update Analyzer - Entry Point
//!
//! Analyses one prepared diagnostic bundle and stores a record per server.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use fwu_analyzer::app::options::BatchOptions;
use fwu_analyzer::app::run::{run, BatchSummary};
use fwu_analyzer::errors::AnalyzerError;
use fwu_analyzer::filesys::dir::Dir;
use fwu_analyzer::filesys::file::File;
use fwu_analyzer::logs::{init_logging, LogLevel, LogOptions};
use fwu_analyzer::persist::file::FileRecordStore;
use fwu_analyzer::persist::http::HttpRecordStore;
use fwu_analyzer::persist::store::RecordStore;
use fwu_analyzer::storage::settings::{Settings, StoreKind};
use serde::Serialize;
use tracing::{error, info};

const EXIT_INCOMPLETE: u8 = 1;
const EXIT_FATAL: u8 = 2;

/// Build identity printed by `--version`
#[derive(Debug, Serialize)]
struct BuildInfo {
    version: &'static str,
    git_hash: &'static str,
    build_time: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = BuildInfo::current();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version: {}", e),
        }
        return ExitCode::SUCCESS;
    }

    let Some(batch_dir) = cli_args.get("batch-dir").map(PathBuf::from) else {
        eprintln!("Usage: fwu-analyzer --batch-dir=<path> [--batch-id=<id>] [--settings=<file>] [--log-level=<level>]");
        return ExitCode::from(EXIT_FATAL);
    };

    // Retrieve the settings file
    let mut settings = match cli_args.get("settings") {
        Some(path) => match load_settings(PathBuf::from(path)).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                return ExitCode::from(EXIT_FATAL);
            }
        },
        None => Settings::default(),
    };
    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => settings.log_level = level,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(EXIT_FATAL);
            }
        }
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        log_dir: settings.log_dir.clone(),
        json_format: settings.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = BatchOptions::from_settings(batch_dir, cli_args.get("batch-id").cloned(), &settings);

    let store = match build_store(&settings, &options.batch_id) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to configure the record store: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    info!("Running analyzer {} with options: {:?}", version.version, options);
    match run(options, store).await {
        Ok(summary) => {
            print_summary(&summary);
            if summary.all_persisted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_INCOMPLETE)
            }
        }
        Err(e) => {
            error!("Failed to run the analyzer: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn load_settings(path: PathBuf) -> Result<Settings, AnalyzerError> {
    let contents = File::new(path).read_string().await?;
    Settings::from_json(&contents)
}

fn build_store(
    settings: &Settings,
    batch_id: &str,
) -> Result<Option<Arc<dyn RecordStore>>, AnalyzerError> {
    let store = &settings.store;
    match store.kind {
        StoreKind::None => Ok(None),
        StoreKind::File => {
            let dir = store.output_dir.clone().ok_or_else(|| {
                AnalyzerError::ConfigError("store.output_dir is required for the file store".to_string())
            })?;
            let store: Arc<dyn RecordStore> = Arc::new(FileRecordStore::new(Dir::new(dir)));
            Ok(Some(store))
        }
        StoreKind::Http => {
            let base_url = store.base_url.as_deref().ok_or_else(|| {
                AnalyzerError::ConfigError("store.base_url is required for the http store".to_string())
            })?;
            let collection = store.collection.as_deref().unwrap_or(batch_id);
            let client: Arc<dyn RecordStore> = Arc::new(HttpRecordStore::new(
                base_url,
                collection,
                store.resolve_token(),
                store.timeout(),
            )?);
            Ok(Some(client))
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "{} {} ({} servers, run {})",
        "Batch".bold(),
        summary.batch_id.bold(),
        summary.servers.len(),
        summary.run_id
    );
    for server in &summary.servers {
        let outcome = if server.update_succeeded {
            "update succeeded".green()
        } else {
            "update failed".red()
        };
        let persisted = if server.persisted {
            "persisted".green()
        } else {
            "not persisted".yellow()
        };
        println!("  {}  {}  {}", server.uuid, outcome, persisted);
        if let Some(err) = &server.error {
            println!("    {}", err.red());
        }
    }
}
