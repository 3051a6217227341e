//! UCP Schema Generator CLI
//!
//! Command-line interface for generating and checking UCP schema variants.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ucp_schema_gen::{check, generate, EmbeddedOptions, GenerateOptions, GenerateReport};

#[derive(Parser)]
#[command(name = "ucp-schema-gen")]
#[command(about = "Generate per-operation UCP schemas from annotated sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate request/response variants and linked catalogs
    Generate {
        /// Annotated source tree
        #[arg(long, default_value = "source")]
        source: PathBuf,

        /// Output tree (removed and rebuilt on every run)
        #[arg(long, default_value = "spec")]
        output: PathBuf,

        /// Skip embedded protocol method aggregation
        #[arg(long)]
        no_embedded: bool,

        /// Version written to the embedded protocol catalog
        #[arg(long)]
        embedded_version: Option<String>,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Only print errors and the summary
        #[arg(long, short)]
        quiet: bool,
    },

    /// Validate annotations in a source tree without writing anything
    Check {
        /// Annotated source tree
        #[arg(default_value = "source")]
        source: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            source,
            output,
            no_embedded,
            embedded_version,
            format,
            quiet,
        } => {
            let embedded = if no_embedded {
                None
            } else {
                let defaults = EmbeddedOptions::default();
                Some(match embedded_version {
                    Some(version) => defaults.version(version),
                    None => defaults,
                })
            };
            let options = GenerateOptions::new(source, output).embedded(embedded);
            run_generate(&options, &format, quiet)
        }
        Commands::Check { source, format } => run_check(&source, &format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_generate(options: &GenerateOptions, format: &str, quiet: bool) -> Result<(), u8> {
    let report = generate(options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code()
    })?;

    if format == "json" {
        print_json(&report);
    } else {
        if !quiet {
            for path in &report.generated {
                println!("  \x1b[32m✓\x1b[0m {}", path.display());
            }
        }
        print_errors(&report);
        println!();
        if report.is_ok() {
            println!(
                "\x1b[32m✓ Generated {} files\x1b[0m",
                report.generated.len()
            );
        } else {
            println!(
                "\x1b[31m✗ Failed with {} errors ({} files generated)\x1b[0m",
                report.errors.len(),
                report.generated.len()
            );
        }
    }

    finish(&report)
}

fn run_check(source: &std::path::Path, format: &str) -> Result<(), u8> {
    let report = check(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code()
    })?;

    if format == "json" {
        print_json(&report);
    } else {
        print_errors(&report);
        if report.is_ok() {
            println!("\x1b[32m✓ {} has no annotation errors\x1b[0m", source.display());
        } else {
            println!(
                "\x1b[31m✗ {} errors in {}\x1b[0m",
                report.errors.len(),
                source.display()
            );
        }
    }

    finish(&report)
}

fn print_errors(report: &GenerateReport) {
    if report.errors.is_empty() {
        return;
    }
    println!("\x1b[31mErrors:\x1b[0m");
    for error in &report.errors {
        println!("  \x1b[31m✗\x1b[0m {}", error);
    }
}

fn print_json(report: &GenerateReport) {
    let output = serde_json::json!({
        "ok": report.is_ok(),
        "generated": report
            .generated
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect::<Vec<_>>(),
        "errors": report.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
    });
    println!("{}", output);
}

fn finish(report: &GenerateReport) -> Result<(), u8> {
    if report.is_ok() {
        Ok(())
    } else {
        Err(report.exit_code())
    }
}
