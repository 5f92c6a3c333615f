// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use pex_core::error::Result;
use pex_core::{ApiEnvelope, Config, JsonFileStore, PrintOutcome, PrintReport};
use pex_print::{AsyncDispatcher, Dispatcher, JobOptions, LabelOptions};
use serde_json::json;
use tracing::{error, info, warn};

use crate::data_dir;
use crate::values::coerce_values;

const FILE_PRINTED: &str = "The file has been successfully printed.";
const LABEL_PRINTED: &str = "The label has been successfully printed.";

/// PEX - Printer Execution Service
#[derive(Parser, Debug)]
#[command(name = "pex", version, long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.json in the PEX data directory)
    #[arg(long, global = true, env = "PEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the JSON envelope instead of a plain message
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Service(ServiceCommand),

    /// Show, set or delete a configuration option
    Config {
        /// Dot-separated option path, e.g. `printers.label` or `formats.A6`;
        /// omit it to show the whole configuration
        key: Option<String>,

        /// New value; several values are stored as a list, `none` clears it
        values: Vec<String>,

        /// Delete the option instead
        #[arg(short, long, conflicts_with = "values", requires = "key")]
        delete: bool,
    },
}

/// Commands that talk to the print system.
#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// List the printers installed on this system
    Printers,

    /// Show version, configured aliases and formats, and installed printers
    Status,

    /// Print an existing file
    PrintFile {
        /// File to print
        path: PathBuf,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Render text lines onto a label and print it
    PrintLines {
        /// Lines to print, one per argument (read from stdin when omitted)
        lines: Vec<String>,

        #[command(flatten)]
        job: JobArgs,

        /// Helvetica or Helvetica-Bold
        #[arg(long)]
        font: Option<String>,

        /// Font size in points
        #[arg(long)]
        font_size: Option<f32>,

        /// Baseline distance in points
        #[arg(long)]
        line_height: Option<f32>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Printer alias or OS printer name (default: `printer_default`)
    #[arg(short, long)]
    pub printer: Option<String>,

    /// Configured format name, or `WIDTHxHEIGHT` in millimetres
    #[arg(short, long)]
    pub format: String,

    /// portrait (P) or landscape (L)
    #[arg(short, long, default_value = "portrait")]
    pub orientation: String,

    /// Number of copies
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub quantity: i64,
}

impl From<JobArgs> for JobOptions {
    fn from(args: JobArgs) -> Self {
        Self {
            printer: args.printer,
            format: args.format,
            orientation: args.orientation,
            quantity: args.quantity,
        }
    }
}

/// Run the parsed command. `Ok(false)` means the command ran but the
/// operation failed (the message has already been written).
///
/// `config` never builds a dispatcher, so it still works on a configuration
/// the dispatcher would reject.
pub async fn run(cli: Cli) -> Result<bool> {
    let config = open_config(cli.config.as_deref());
    let json = cli.json;

    let outcome = match cli.command {
        Commands::Config {
            key,
            values,
            delete,
        } => run_config(&config, key.as_deref(), &values, delete),
        Commands::Service(command) => match Dispatcher::new(config) {
            Ok(dispatcher) => run_service(&AsyncDispatcher::new(dispatcher), command, json).await,
            Err(e) => Err(e),
        },
    };

    match outcome {
        Err(e) if json => emit(&ApiEnvelope::error(e.to_string(), None)),
        other => other,
    }
}

fn open_config(path: Option<&Path>) -> Config {
    let path = path.map(Path::to_path_buf).unwrap_or_else(data_dir::config_path);
    let legacy = data_dir::legacy_path_for(&path);
    info!(path = %path.display(), "using configuration file");
    Config::new(JsonFileStore::new(path).with_legacy(legacy))
}

async fn run_service(
    service: &AsyncDispatcher,
    command: ServiceCommand,
    json: bool,
) -> Result<bool> {
    match command {
        ServiceCommand::Printers => {
            let printers = service.list_printers().await?;
            if json {
                return emit(&ApiEnvelope::success(&printers));
            }
            for name in &printers {
                println!("{name}");
            }
            Ok(true)
        }
        ServiceCommand::Status => emit(&ApiEnvelope::success(service.status().await?)),
        ServiceCommand::PrintFile { path, job } => {
            let result = service.print_file(path, job.into()).await;
            finish(result, FILE_PRINTED, json)
        }
        ServiceCommand::PrintLines {
            lines,
            job,
            font,
            font_size,
            line_height,
        } => {
            let lines = if lines.is_empty() {
                read_stdin_lines()?
            } else {
                lines
            };
            let label = LabelOptions {
                font,
                font_size,
                line_height,
            };
            let result = service.print_lines(lines, job.into(), label).await;
            finish(result, LABEL_PRINTED, json)
        }
    }
}

fn run_config(
    config: &Config,
    key: Option<&str>,
    values: &[String],
    delete: bool,
) -> Result<bool> {
    let Some(key) = key else {
        println!("{}", serde_json::to_string_pretty(&config.document()?)?);
        return Ok(true);
    };

    if delete {
        if config.delete_option(key)? {
            println!("{key} option has been deleted");
            return Ok(true);
        }
        eprintln!("{key} option is not set");
        return Ok(false);
    }

    if let Some(value) = coerce_values(values) {
        config.set_option(key, value)?;
    }
    match config.get_option(key)? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("{key} option is not set"),
    }
    Ok(true)
}

fn finish(result: Result<PrintReport>, success_message: &str, json: bool) -> Result<bool> {
    match &result {
        Ok(report) => {
            for warning in &report.warnings {
                warn!(%warning, "print finished with a warning");
            }
        }
        Err(e) if e.is_validation() => warn!(error = %e, "print request rejected"),
        Err(e) => error!(error = %e, "print failed"),
    }

    if json {
        let envelope = match &result {
            Ok(report) => ApiEnvelope::success(json!({
                "message": success_message,
                "report": report,
            })),
            Err(e) => ApiEnvelope::error(e.to_string(), None),
        };
        return emit(&envelope);
    }

    let outcome = PrintOutcome::from_result(&result, success_message);
    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message);
    }
    Ok(outcome.success)
}

/// Write the envelope to stdout; the result is whether it reports success.
fn emit(envelope: &ApiEnvelope) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(envelope.is_success())
}

fn read_stdin_lines() -> Result<Vec<String>> {
    let lines = std::io::stdin()
        .lock()
        .lines()
        .collect::<std::io::Result<Vec<_>>>()?;
    Ok(lines)
}
