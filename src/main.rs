use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::Level;

use kmp_updater::{ConversionOutcome, ConversionStatus, ConvertOptions, convert_batch, inspect_file};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Upgrade KMP course files to the current canonical layout.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Course files to convert. Paths that do not exist are skipped.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
    /// Write converted files here instead of next to each input.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Print the header and sections of each file without converting.
    #[arg(long)]
    inspect: bool,
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn print_outcome(outcome: &ConversionOutcome, format: ReportFormat) {
    if format == ReportFormat::Json {
        match serde_json::to_string(outcome) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error serializing report: {e}"),
        }
        return;
    }

    match &outcome.status {
        ConversionStatus::Converted {
            output, warnings, ..
        } => {
            for warning in warnings {
                println!("{}: {warning}", outcome.input.display());
            }
            println!("Converted file: {}", output.display());
        }
        ConversionStatus::Skipped => {}
        ConversionStatus::Failed { detail, .. } => {
            println!("{}: {detail}", outcome.input.display());
        }
    }
}

fn inspect(cli: &Cli) -> bool {
    let mut ok = true;
    for file in &cli.files {
        if !file.exists() {
            continue;
        }
        match inspect_file(file) {
            Ok(summary) if cli.report == ReportFormat::Json => {
                match serde_json::to_string(&summary) {
                    Ok(line) => println!("{line}"),
                    Err(e) => eprintln!("Error serializing summary: {e}"),
                }
            }
            Ok(summary) => {
                println!(
                    "{}: version {:#x}, {} sections, {} bytes declared",
                    file.display(),
                    summary.version,
                    summary.section_count,
                    summary.file_size
                );
                for section in &summary.sections {
                    println!(
                        "  {} entries={:<5} extra={:#06x} payload={:#x}",
                        section.tag, section.entry_count, section.extra, section.payload_bytes
                    );
                }
                for warning in &summary.warnings {
                    println!("  warning: {warning}");
                }
            }
            Err(e) => {
                ok = false;
                println!("{}: {e}", file.display());
            }
        }
    }
    ok
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ok = if cli.inspect {
        inspect(&cli)
    } else {
        let options = ConvertOptions {
            output_dir: cli.output_dir.clone(),
        };
        let outcomes = convert_batch(&cli.files, &options);
        for outcome in &outcomes {
            print_outcome(outcome, cli.report);
        }
        !outcomes.iter().any(ConversionOutcome::is_failure)
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
