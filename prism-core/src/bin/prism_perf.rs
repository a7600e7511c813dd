//! Perf harness CLI
//!
//! Profiles every story of the component catalog and writes the HTML
//! summary for the pull request comment. Logs go to stderr; stdout carries
//! only the pipeline variable lines.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use prism_core::perf::{
    CommandProfiler, PerfConfig, PerfRun, Profiler, RecordedProfiler, Result, StoryCatalog,
};

#[derive(Parser)]
#[command(name = "prism-perf")]
#[command(about = "Profile component stories and report ticks per iteration", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["results", "profiler"])))]
struct Cli {
    /// Story catalog JSON
    #[arg(long)]
    stories: PathBuf,

    /// Replay a results JSON file instead of profiling
    #[arg(long)]
    results: Option<PathBuf>,

    /// Profiler command; trailing arguments are passed through
    #[arg(long)]
    profiler: Option<String>,

    /// Arguments for the profiler command
    #[arg(last = true)]
    profiler_args: Vec<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for artifacts and the report
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Scratch directory for profiler logs
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// List only results flagged as regressions
    #[arg(long)]
    only_regressions: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<PerfConfig> {
        let mut config = match &self.config {
            Some(path) => PerfConfig::from_toml_file(path)?,
            None => PerfConfig::default(),
        };

        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        if let Some(temp_dir) = &self.temp_dir {
            config.temp_dir = temp_dir.clone();
        }
        if self.only_regressions {
            config.show_all = false;
        }
        Ok(config)
    }
}

async fn run<P: Profiler>(config: PerfConfig, profiler: P, catalog: &StoryCatalog) -> Result<()> {
    let outcome = PerfRun::new(config, profiler).execute(catalog).await?;
    info!(status = %outcome.status, path = %outcome.output_path.display(), "perf run complete");

    for line in outcome.pipeline_variables() {
        println!("{line}");
    }
    Ok(())
}

async fn try_main(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let catalog = StoryCatalog::from_json_file(&cli.stories)?;
    info!(stories = catalog.story_count(), "loaded story catalog");

    match (&cli.results, &cli.profiler) {
        (Some(results), _) => run(config, RecordedProfiler::new(results), &catalog).await,
        (None, Some(program)) => {
            let profiler = CommandProfiler::new(program).args(cli.profiler_args.iter().cloned());
            run(config, profiler, &catalog).await
        }
        (None, None) => unreachable!("clap requires a result source"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match try_main(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "perf run failed");
            ExitCode::FAILURE
        }
    }
}
