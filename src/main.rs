// EveTranslator - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and command-line overrides
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to the run / scan / replay commands

use clap::{Parser, Subcommand};
use eve_translator::app::dir_watcher::{scan_once, DirWatchConfig};
use eve_translator::app::manager::{build_pipeline, TranslatorManager};
use eve_translator::core::export;
use eve_translator::core::model::{AppEvent, SessionKind};
use eve_translator::platform::config::{load_config, AppConfig, PlatformPaths};
use eve_translator::platform::fs::read_utf16_file;
use eve_translator::platform::window::SystemWindowCheck;
use eve_translator::util::{self, error::TranslatorError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// EVE Translator - live chat-log tailer and translator.
///
/// Follows the game client's fleet and local chat transcripts, translates
/// foreign-language messages and prints them as they arrive.
#[derive(Parser, Debug)]
#[command(name = "eve-translator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Chat-log directory (overrides config and the platform default).
    #[arg(short = 'l', long = "log-dir", global = true)]
    log_dir: Option<PathBuf>,

    /// Target language code, e.g. "en" or "de".
    #[arg(short = 't', long = "target", global = true)]
    target: Option<String>,

    /// Use the offline mock provider instead of a network provider.
    #[arg(long = "mock", global = true)]
    mock: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Directory holding config.toml, user glossaries and ignore patterns.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tail the enabled sessions and print messages (default).
    Run,

    /// Discover characters and group channels once and print them.
    Scan {
        /// Write both registries to a CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write both registries to a JSON file.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Run every line of a transcript through the pipeline once.
    Replay {
        /// Transcript file (UTF-16LE).
        file: PathBuf,

        /// Session tag to print with each message.
        #[arg(short = 's', long = "session", default_value = "local")]
        session: SessionKind,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut paths = PlatformPaths::resolve();
    if let Some(dir) = &cli.config {
        paths = paths.with_config_dir(dir);
    }

    let (mut config, warnings) = load_config(&paths);
    apply_overrides(&mut config, &cli);

    util::logging::init(cli.debug, config.log_level.as_deref(), config.log_file.as_deref());
    for w in &warnings {
        tracing::warn!(warning = %w, "Configuration warning");
    }
    tracing::info!(
        version = util::constants::APP_VERSION,
        config_dir = %paths.config_dir.display(),
        log_dir = %config.log_dir.display(),
        "EVE Translator starting"
    );

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config, paths),
        Command::Scan { csv, json } => scan(&config, csv.as_deref(), json.as_deref()),
        Command::Replay { file, session } => replay(&config, &paths, &file, session),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Fatal error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(target) = &cli.target {
        config.target_language = target.trim().to_lowercase();
    }
    if cli.mock {
        config.mock_provider = true;
    }
}

// =============================================================================
// Commands
// =============================================================================

fn run(config: AppConfig, paths: PlatformPaths) -> util::error::Result<()> {
    config.validate_log_dir()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "Cannot install Ctrl-C handler; interrupt will not stop cleanly");
    }

    let (tx, rx) = mpsc::channel();
    let mut manager = TranslatorManager::from_config(config, paths, tx);
    manager.start();
    manager.run_until(&rx, &running, print_event);
    Ok(())
}

fn scan(config: &AppConfig, csv: Option<&Path>, json: Option<&Path>) -> util::error::Result<()> {
    config.validate_log_dir()?;

    let watch = DirWatchConfig {
        log_dir: config.log_dir.clone(),
        scan_interval: config.scan_interval,
        fleet_inactive_threshold_secs: config.fleet_inactive_threshold_secs,
    };
    let update = scan_once(&watch, &SystemWindowCheck);

    println!("Characters ({}):", update.identities.len());
    for c in update.identities.iter() {
        println!(
            "  {:<12} {:<24} {:<16} {}",
            c.character_id,
            c.character_name,
            c.system_name.as_deref().unwrap_or("-"),
            if c.is_active { "active" } else { "idle" }
        );
    }
    println!("Group channels ({}):", update.groups.len());
    for g in update.groups.iter() {
        println!(
            "  {:<24} created {}  {}",
            g.listener_name,
            g.created_time.format("%Y-%m-%d %H:%M:%S"),
            g.log_path.display()
        );
    }

    if let Some(path) = csv {
        let file = create_export_file(path)?;
        let rows = export::export_csv(&update.identities, &update.groups, file, path)?;
        tracing::info!(file = %path.display(), rows, "CSV export written");
    }
    if let Some(path) = json {
        let file = create_export_file(path)?;
        let entries = export::export_json(&update.identities, &update.groups, file, path)?;
        tracing::info!(file = %path.display(), entries, "JSON export written");
    }
    Ok(())
}

fn replay(
    config: &AppConfig,
    paths: &PlatformPaths,
    file: &Path,
    session: SessionKind,
) -> util::error::Result<()> {
    let text = read_utf16_file(file).map_err(|e| TranslatorError::Io {
        path: file.to_path_buf(),
        operation: "read transcript",
        source: e,
    })?;

    let pipeline = build_pipeline(config, paths);
    let mut messages = 0usize;
    for line in text.lines() {
        if let Some(event) = pipeline.process_line(session, line) {
            print_event(event);
            messages += 1;
        }
    }
    tracing::info!(file = %file.display(), messages, "Replay complete");
    Ok(())
}

fn create_export_file(path: &Path) -> util::error::Result<std::io::BufWriter<std::fs::File>> {
    std::fs::File::create(path)
        .map(std::io::BufWriter::new)
        .map_err(|e| TranslatorError::Io {
            path: path.to_path_buf(),
            operation: "create export file",
            source: e,
        })
}

// =============================================================================
// Output
// =============================================================================

fn print_event(event: AppEvent) {
    match event {
        AppEvent::MessageReady {
            session,
            text,
            sender,
            timestamp,
            original,
            is_translated,
        } => {
            println!("[{timestamp}] [{}] {sender}: {text}", session.tag());
            if is_translated && original != text {
                println!("           ({original})");
            }
        }
        AppEvent::IdentitiesUpdated(registry) => {
            tracing::debug!(
                characters = registry.len(),
                active = registry.iter().filter(|c| c.is_active).count(),
                "Characters updated"
            );
        }
        AppEvent::GroupsUpdated { registry, selected } => {
            tracing::debug!(groups = registry.len(), selected = ?selected, "Group channels updated");
        }
        AppEvent::SessionStateChanged { session, running } => {
            tracing::info!(session = %session, running, "Session state changed");
        }
        AppEvent::HistoryCleared { session } => {
            println!("--- [{}] source changed ---", session.tag());
        }
    }
}
