use anyhow::Result;
use clap::Parser;
use lockfile_audit::{
    config::Config,
    output::{print_result, OutputFormat},
    pipeline::Pipeline,
    report::{log_fatal, log_outcome, write_report},
    runner::ProcessRunner,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
}

#[derive(Parser)]
#[command(name = "lockfile-audit")]
#[command(
    author,
    version,
    about = "Audit Cargo lockfiles under a source tree and fail on known vulnerabilities"
)]
struct Cli {
    /// Root of the source tree to scan
    #[arg(long)]
    srcdir: PathBuf,

    /// Output directory (accepted for build-service compatibility, unused)
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Config file (defaults to the per-user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Summary format printed on stdout (table, json)
    #[arg(short, long)]
    format: Option<String>,

    /// Write the JSON summary to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Local advisory database, overrides the config file. Must already exist
    #[arg(long)]
    advisory_db: Option<PathBuf>,

    /// Per-command timeout in seconds, overrides the config file
    #[arg(long)]
    timeout: Option<u64>,

    /// Audit lockfiles concurrently
    #[arg(long)]
    parallel: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log_fatal(&e);
            ExitCode::from(exit_codes::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.advisory_db.is_some() {
        config.advisory_db = cli.advisory_db;
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }
    config.advisory_db = Some(config.resolve_advisory_db()?);

    if let Some(outdir) = &cli.outdir {
        tracing::debug!(outdir = %outdir.display(), "--outdir is ignored");
    }

    let format_str = cli.format.unwrap_or_else(|| config.default_format.clone());
    let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

    let runner = ProcessRunner::new(config.timeout());
    let summary = Pipeline::new(&config, &runner)
        .parallel(cli.parallel)
        .run(&cli.srcdir)
        .await?;

    if let Some(path) = &cli.report {
        write_report(&summary, path)?;
    }
    print_result(&summary, format)?;
    log_outcome(&summary);

    Ok(if summary.is_vulnerable() {
        exit_codes::FAILURE
    } else {
        exit_codes::SUCCESS
    })
}
