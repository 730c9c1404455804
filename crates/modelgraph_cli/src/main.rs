//! Command-line entry point for snapshot maintenance.
//!
//! # Responsibility
//! - Migrate persisted snapshots to the latest schema version.
//! - Report integrity issues of a snapshot.
//! - Keep output deterministic for scripting.

use clap::{Parser, Subcommand};
use log::{error, info};
use modelgraph_core::store::integrity;
use modelgraph_core::{
    core_version, init_stderr_logging, latest_version, load_document_file, save_document_file,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Model snapshot maintenance tool
#[derive(Parser, Debug)]
#[command(name = "modelgraph", author, version, about, long_about = None)]
struct Args {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a snapshot, apply pending migrations and print one line per step
    Migrate {
        /// Snapshot to read
        input: PathBuf,
        /// Where to write the migrated snapshot
        output: Option<PathBuf>,
    },
    /// Load a snapshot and print every integrity issue
    Check {
        /// Snapshot to read
        input: PathBuf,
    },
    /// Print core and schema versions
    Version,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_stderr_logging(&args.log_level) {
        eprintln!("logging disabled: {err}");
    }

    match run(&args.command) {
        Ok(code) => code,
        Err(message) => {
            error!("event=cli module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command) -> Result<ExitCode, String> {
    match command {
        Command::Migrate { input, output } => {
            let loaded = load_document_file(input).map_err(|err| err.to_string())?;
            println!(
                "from_version={} to_version={}",
                loaded.from_version, loaded.document.version
            );
            for note in &loaded.notes {
                println!("{note}");
            }
            if let Some(output) = output {
                save_document_file(&loaded.document, output).map_err(|err| err.to_string())?;
                info!("event=cli_migrate module=cli status=ok");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { input } => {
            let loaded = load_document_file(input).map_err(|err| err.to_string())?;
            let issues = integrity::check(&loaded.document);
            for issue in &issues {
                println!("{issue}");
            }
            if issues.is_empty() {
                println!("ok");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("issues={}", issues.len());
                Ok(ExitCode::from(2))
            }
        }
        Command::Version => {
            println!("modelgraph_core version={}", core_version());
            println!("schema version={}", latest_version());
            Ok(ExitCode::SUCCESS)
        }
    }
}
