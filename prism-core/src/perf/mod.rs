//! Perf harness for the component story catalog.
//!
//! A run turns every story into a profiling scenario, hands the scenarios to
//! an external profiler and summarizes its results as an HTML table for a
//! pull request comment.
//!
//! ```text
//! stories.json ─► build_scenarios ─► Profiler::cook ─► ReportBuilder ─► perfCounts.html
//! ```
//!
//! [`PerfRun`] drives the whole pipeline; the pieces are usable on their own.

mod config;
mod error;
mod report;
mod results;
mod runner;
mod scenario;
mod stories;

pub use config::{PerfConfig, DEFAULT_TICKS_HELP_URL};
pub use error::{PerfError, Result};
pub use report::{format_significant, ReportBuilder, ReportRow, NO_RESULTS};
pub use results::{
    results_from_json_str, Analysis, CookResult, CookResults, Processed, ProcessedError,
    ProcessedOutput, Regression,
};
pub use runner::{
    prepare_temp_dir, CommandProfiler, PerfOutcome, PerfRun, PerfStatus, Profiler,
    RecordedProfiler, SCENARIO_FILE,
};
pub use scenario::{build_scenarios, generate_url, scenario_name, Scenario, ScenarioKey, Scenarios};
pub use stories::{StoryCatalog, StoryMeta};
