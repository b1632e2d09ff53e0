//! Completable demo CLI (feature-gated).

use clap::{ArgAction, Parser, ValueEnum};
use completable::demo;
use completable::observability::{LogSink, TracingSink};
use completable::{BuildError, ExecutorBuilder, Failure};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "completable", version, about = "Task composition demos")]
struct Cli {
    /// Scenario to run
    #[arg(value_enum, default_value_t = Scenario::Downloads)]
    scenario: Scenario,

    /// Age fed to the validation scenarios
    #[arg(long = "age", default_value_t = -1, allow_hyphen_values = true)]
    age: i32,

    /// Number of simulated downloads
    #[arg(long = "count", default_value_t = 10)]
    count: usize,

    /// Simulated latency of each download, in milliseconds
    #[arg(long = "delay-ms", default_value_t = 2000)]
    delay_ms: u64,

    /// Worker threads (overrides COMPLETABLE_WORKER_THREADS)
    #[arg(short = 'j', long = "workers")]
    workers: Option<usize>,

    /// Executor configuration file (TOML)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Scenario {
    /// Recover a failed validation, then map the result
    Exceptionally,
    /// Recover a failed validation with a two-argument handler
    Handle,
    /// Gather many failing downloads
    Downloads,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to build executor: {0}")]
    Build(#[from] BuildError),
    #[error("scenario failed: {0}")]
    Scenario(#[from] Failure),
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Build(_) => 2,
            Self::Scenario(_) => 1,
        }
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn builder_for(cli: &Cli) -> Result<ExecutorBuilder, BuildError> {
    let builder = match &cli.config {
        Some(path) => ExecutorBuilder::from_toml_file(path)?,
        None => ExecutorBuilder::from_env()?,
    };
    Ok(match cli.workers {
        Some(n) => builder.worker_threads(n),
        None => builder,
    })
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let executor = builder_for(cli)?.build()?;
    let sink: Arc<dyn LogSink> = Arc::new(TracingSink);

    let output = match cli.scenario {
        Scenario::Exceptionally => demo::exceptionally(&executor, cli.age, sink).wait()?,
        Scenario::Handle => demo::handle(&executor, cli.age, sink).wait()?,
        Scenario::Downloads => {
            let locations = demo::download_locations(cli.count);
            let delay = Duration::from_millis(cli.delay_ms);
            let results = demo::multiple_downloads(&executor, &locations, delay, &sink).wait()?;
            demo::render_report(&results)
        }
    };
    println!("{output}");
    Ok(())
}
