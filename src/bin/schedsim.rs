//! schedsim: run a multi-node process scheduling simulation.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use schedsim::{Simulation, Workload};

/// Run a multi-node process scheduling simulation.
#[derive(Parser)]
#[command(name = "schedsim")]
struct Cli {
    /// Path to a workload description; reads standard input when omitted.
    workload: Option<PathBuf>,

    /// Suppress per-transition trace lines, print only the summary.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let text = match &cli.workload {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read standard input")?;
            buf
        }
    };

    let workload = Workload::parse(&text).context("bad input")?;

    let sink: Option<Box<dyn Write + Send>> = if cli.quiet {
        None
    } else {
        Some(Box::new(io::stdout()))
    };
    let report = Simulation::run(workload, sink);

    let mut out = io::stdout().lock();
    for summary in &report.summaries {
        writeln!(out, "{summary}")?;
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}
