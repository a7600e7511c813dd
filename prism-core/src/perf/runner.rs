//! Perf run orchestration.
//!
//! # How a Run Works
//!
//! 1. Every catalog story becomes a scenario URL against the deployed page.
//! 2. The temp directory is created, or emptied of leftovers from an
//!    earlier run.
//! 3. The [`Profiler`] cooks the scenarios into results.
//! 4. The report is rendered and written into the output directory.
//!
//! The profiler is a black box behind a trait. [`CommandProfiler`] runs an
//! external tool and [`RecordedProfiler`] replays results captured earlier.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::PerfConfig;
use super::error::{PerfError, Result};
use super::report::ReportBuilder;
use super::results::{results_from_json_str, CookResults};
use super::scenario::{build_scenarios, Scenarios};
use super::stories::StoryCatalog;

/// Name of the scenario file handed to [`CommandProfiler`].
pub const SCENARIO_FILE: &str = "scenarios.json";

/// Turns scenarios into results.
pub trait Profiler {
    /// Profile every scenario and return the results keyed by scenario name.
    fn cook(
        &self,
        scenarios: &Scenarios,
        config: &PerfConfig,
    ) -> impl Future<Output = Result<CookResults>> + Send;
}

/// Replays a results file written by an earlier profiler run.
#[derive(Debug, Clone)]
pub struct RecordedProfiler {
    path: PathBuf,
}

impl RecordedProfiler {
    /// Replay the results stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Profiler for RecordedProfiler {
    fn cook(
        &self,
        scenarios: &Scenarios,
        _config: &PerfConfig,
    ) -> impl Future<Output = Result<CookResults>> + Send {
        let requested = scenarios.len();
        async move {
            let source = tokio::fs::read_to_string(&self.path).await?;
            let results = results_from_json_str(&source)?;
            debug!(
                path = %self.path.display(),
                requested,
                recorded = results.len(),
                "replaying recorded results"
            );
            Ok(results)
        }
    }
}

/// Runs an external profiler.
///
/// The command receives its configured arguments followed by the scenario
/// file, the output directory and the temp directory. It must print the
/// results JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandProfiler {
    program: String,
    args: Vec<String>,
}

impl CommandProfiler {
    /// Run `program` with no extra arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append arguments passed ahead of the three directory arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Profiler for CommandProfiler {
    fn cook(
        &self,
        scenarios: &Scenarios,
        config: &PerfConfig,
    ) -> impl Future<Output = Result<CookResults>> + Send {
        let scenario_file = config.temp_dir.join(SCENARIO_FILE);
        let encoded = serde_json::to_string_pretty(scenarios);
        let out_dir = config.out_dir.clone();
        let temp_dir = config.temp_dir.clone();

        async move {
            tokio::fs::write(&scenario_file, encoded?).await?;

            info!(command = %self.command_line(), "starting profiler");
            let output = Command::new(&self.program)
                .args(&self.args)
                .arg(&scenario_file)
                .arg(&out_dir)
                .arg(&temp_dir)
                .output()
                .await?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(stderr = %stderr.trim_end(), "profiler failed");
                return Err(PerfError::ProfilerExit {
                    command: self.command_line(),
                    code: output.status.code(),
                });
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.trim().is_empty() {
                return Err(PerfError::profiler(format!(
                    "{} printed no results",
                    self.command_line()
                )));
            }
            results_from_json_str(&stdout).map_err(|err| {
                PerfError::profiler(format!(
                    "{} printed unreadable results: {err}",
                    self.command_line()
                ))
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfStatus {
    Success,
}

impl PerfStatus {
    /// The status as announced to the pipeline.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
        }
    }
}

impl fmt::Display for PerfStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct PerfOutcome {
    pub status: PerfStatus,
    pub report: String,
    pub output_path: PathBuf,
    /// Path announced to the pipeline.
    pub comment_path: String,
}

impl PerfOutcome {
    /// Logging commands that hand the report to the CI pipeline.
    pub fn pipeline_variables(&self) -> [String; 2] {
        [
            format!(
                "##vso[task.setvariable variable=PerfCommentFilePath;]{}",
                self.comment_path
            ),
            format!(
                "##vso[task.setvariable variable=PerfCommentStatus;]{}",
                self.status
            ),
        ]
    }
}

/// One perf run: scenarios in, report out.
pub struct PerfRun<P> {
    config: PerfConfig,
    profiler: P,
}

impl<P: Profiler> PerfRun<P> {
    /// Pair a configuration with the profiler that will cook its scenarios.
    pub fn new(config: PerfConfig, profiler: P) -> Self {
        Self { config, profiler }
    }

    /// The run's configuration.
    pub fn config(&self) -> &PerfConfig {
        &self.config
    }

    /// The profiler the run cooks with.
    pub fn profiler(&self) -> &P {
        &self.profiler
    }

    /// Generate scenarios, cook them and write the report.
    pub async fn execute(&self, catalog: &StoryCatalog) -> Result<PerfOutcome> {
        let deploy_url = self.config.deploy_url();
        let scenarios = build_scenarios(catalog, &deploy_url, self.config.default_iterations);
        info!(scenarios = scenarios.len(), %deploy_url, "generated scenarios");
        for (name, scenario) in &scenarios {
            debug!(%name, url = %scenario.url, "scenario");
        }

        prepare_temp_dir(&self.config.temp_dir).await?;

        let results = self.profiler.cook(&scenarios, &self.config).await?;
        info!(results = results.len(), "profiler finished");

        let report = ReportBuilder::from_config(catalog, &results, &self.config).render();

        tokio::fs::create_dir_all(&self.config.out_dir).await?;
        let output_path = self.config.report_path();
        tokio::fs::write(&output_path, &report).await?;
        info!(path = %output_path.display(), "wrote perf report");

        let comment_path = self
            .config
            .pipeline_comment_path
            .clone()
            .unwrap_or_else(|| output_path.display().to_string());

        Ok(PerfOutcome {
            status: PerfStatus::Success,
            report,
            output_path,
            comment_path,
        })
    }
}

/// Create `dir`, or empty it if it already exists.
pub async fn prepare_temp_dir(dir: &Path) -> Result<()> {
    if !tokio::fs::try_exists(dir).await? {
        tokio::fs::create_dir_all(dir).await?;
        return Ok(());
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        warn!(path = %path.display(), "removing leftover temp file");
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
    }
    Ok(())
}

// ---- Tests ----
