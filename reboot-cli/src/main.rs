//! ReBoot CLI Entry Point
//!
//! Thin wrapper over the engine: parse arguments, configure logging, run
//! the refactorings over the given tree, print a summary.

use clap::Parser;
use reboot_core::Run;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reboot")]
#[command(about = "Rewrites annotation-driven wiring in Java sources to explicit constructors")]
#[command(version)]
struct Cli {
    /// Root of the source tree to rewrite, in place
    location: PathBuf,

    /// Refactorings to skip, by name (repeatable)
    #[arg(short = 'e', long = "excluded", value_name = "NAME")]
    excluded: Vec<String>,

    /// Print the run report as JSON instead of the one-line summary
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("ReBooting {}", cli.location.display());
    let report = Run::new(&cli.location).exclude(cli.excluded).execute()?;
    tracing::info!("ReBooting completed");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} of {} files rewritten",
            report.files_changed, report.files_scanned
        );
        if report.parse_failures > 0 {
            println!("{} files skipped (parse failures)", report.parse_failures);
        }
        if report.io_failures > 0 {
            println!("{} files skipped (unreadable)", report.io_failures);
        }
        if report.ambiguities > 0 {
            println!(
                "{} declarations left untouched (ambiguous)",
                report.ambiguities
            );
        }
    }
    Ok(())
}
