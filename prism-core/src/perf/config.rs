//! Perf harness configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) yields
//! a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Link shown in the ticks column header.
pub const DEFAULT_TICKS_HELP_URL: &str =
    "https://github.com/OfficeDev/office-ui-fabric-react/wiki/Perf-Testing#why-are-results-listed-in-ticks-instead-of-time-units";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    /// Where the profiler writes artifacts and the report is written.
    pub out_dir: PathBuf,
    /// Scratch directory for profiler logs. Emptied before each run.
    pub temp_dir: PathBuf,
    /// Page the scenarios load. Defaults to `file://<out_dir>/index.html`.
    pub deploy_url: Option<String>,
    /// Iterations for stories that declare none.
    pub default_iterations: u32,
    /// Story used as the comparison column; never given its own row.
    pub baseline_story: String,
    pub report_file: String,
    /// Include every result, not just flagged regressions.
    pub show_all: bool,
    pub ticks_help_url: String,
    /// Path announced to the CI pipeline instead of the real output path.
    pub pipeline_comment_path: Option<String>,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist"),
            temp_dir: PathBuf::from("logfiles"),
            deploy_url: None,
            default_iterations: 1,
            baseline_story: "Fabric".to_string(),
            report_file: "perfCounts.html".to_string(),
            show_all: true,
            ticks_help_url: DEFAULT_TICKS_HELP_URL.to_string(),
            pipeline_comment_path: None,
        }
    }
}

impl PerfConfig {
    /// Parse a config; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a config file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// URL of the page scenarios are generated against.
    pub fn deploy_url(&self) -> String {
        match &self.deploy_url {
            Some(url) => url.clone(),
            None => {
                let out_dir = if self.out_dir.is_absolute() {
                    self.out_dir.clone()
                } else {
                    std::env::current_dir()
                        .map(|cwd| cwd.join(&self.out_dir))
                        .unwrap_or_else(|_| self.out_dir.clone())
                };
                format!("file://{}/index.html", out_dir.display())
            }
        }
    }

    /// Where the rendered report is written.
    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(&self.report_file)
    }
}
