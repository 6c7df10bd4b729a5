use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xtask::{discover_cases, run_cases, Format, Selection};

/// Developer tasks for the hipcts conformance suite.
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    /// Log orchestration details to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build the test binaries and run every case in its own process.
    Run {
        #[command(flatten)]
        select: SelectArgs,

        /// Per-case timeout in seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },
    /// Print the cases that `run` would execute.
    List {
        #[command(flatten)]
        select: SelectArgs,
    },
}

#[derive(Args)]
struct SelectArgs {
    /// Only this package's test binaries
    #[arg(long, short = 'p')]
    package: Option<String>,

    /// Already built test binary to use instead of building (repeatable)
    #[arg(long = "bin", value_name = "PATH")]
    bins: Vec<PathBuf>,

    /// Only cases whose name contains this substring
    #[arg(long)]
    filter: Option<String>,
}

impl From<SelectArgs> for Selection {
    fn from(args: SelectArgs) -> Self {
        Selection {
            package: args.package,
            binaries: args.bins,
            filter: args.filter,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Run {
            select,
            timeout,
            format,
        } => run(select.into(), Duration::from_secs(timeout), format),
        Cmd::List { select } => list(select.into()),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(selection: Selection, timeout: Duration, format: Format) -> Result<()> {
    let cases = discover_cases(&selection)?;
    if cases.is_empty() {
        bail!("No test cases matched");
    }

    let report = run_cases(&cases, timeout)?;
    println!("{}", report.render(format)?.trim_end());

    if !report.all_passed() {
        bail!(
            "{} case(s) failed, {} timed out",
            report.counts.failed,
            report.counts.timed_out
        );
    }
    Ok(())
}

fn list(selection: Selection) -> Result<()> {
    for case in discover_cases(&selection)? {
        println!("{}::{}", case.binary.name, case.name);
    }
    Ok(())
}
