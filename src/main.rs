use clap::Parser;
use gcp_inventory::cli::{Args, LogLevel};
use gcp_inventory::config::{InventoryConfig, Settings};
use gcp_inventory::gcp::auth::{self, CredentialSource};
use gcp_inventory::inventory::render_summary;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Exit code when no project could be determined
const EXIT_USAGE: u8 = 2;

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Could not open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcp-inventory started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcp-inventory").join("gcp-inventory.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcp-inventory").join("gcp-inventory.log");
    }
    PathBuf::from("gcp-inventory.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let settings = Settings::load();
    let config = match InventoryConfig::resolve(
        &args,
        &settings,
        auth::get_default_project(),
        CredentialSource::from_env(),
        chrono::Utc::now(),
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    println!(
        "Gathering resources for {} ({} mode)",
        config.projects.join(", "),
        config.mode
    );

    let run = gcp_inventory::execute(&config).await;
    print!("{}", render_summary(&run));

    ExitCode::from(run.status().exit_code() as u8)
}
