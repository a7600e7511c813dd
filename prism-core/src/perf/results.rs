//! Profiler results.
//!
//! These types mirror the JSON the external profiler writes. Only the
//! fields the report reads are modelled; unknown fields are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Results keyed by scenario name (`"<kind>.<story>"`), in sorted order.
pub type CookResults = BTreeMap<String, CookResult>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookResult {
    pub analysis: Option<Analysis>,
    pub processed: Processed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    pub num_ticks: Option<u64>,
    pub regression: Option<Regression>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Regression {
    pub is_regression: bool,
    pub regression_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Processed {
    pub output: Option<ProcessedOutput>,
    pub error: Option<ProcessedError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessedOutput {
    pub flamegraph_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessedError {
    pub error_file: Option<String>,
}

impl CookResult {
    /// A result with only a tick count.
    pub fn with_ticks(ticks: u64) -> Self {
        Self {
            analysis: Some(Analysis {
                num_ticks: Some(ticks),
                ..Analysis::default()
            }),
            processed: Processed::default(),
        }
    }

    /// Attach a flamegraph artifact.
    pub fn flamegraph(mut self, file: impl Into<String>) -> Self {
        self.processed.output = Some(ProcessedOutput {
            flamegraph_file: Some(file.into()),
        });
        self
    }

    /// Attach an error artifact.
    pub fn error(mut self, file: impl Into<String>) -> Self {
        self.processed.error = Some(ProcessedError {
            error_file: Some(file.into()),
        });
        self
    }

    /// Flag the result as a regression, optionally with its analysis file.
    pub fn regression(mut self, file: Option<String>) -> Self {
        self.analysis.get_or_insert_with(Analysis::default).regression = Some(Regression {
            is_regression: true,
            regression_file: file,
        });
        self
    }

    /// Tick count of the run, if the profiler measured one.
    pub fn ticks(&self) -> Option<u64> {
        self.analysis.as_ref().and_then(|a| a.num_ticks)
    }

    /// Error log written for a failed run.
    pub fn error_artifact(&self) -> Option<&str> {
        self.processed
            .error
            .as_ref()
            .and_then(|e| e.error_file.as_deref())
    }

    /// Flamegraph written for a successful run.
    pub fn flamegraph_artifact(&self) -> Option<&str> {
        self.processed
            .output
            .as_ref()
            .and_then(|o| o.flamegraph_file.as_deref())
    }

    /// Whether the analysis flagged a regression.
    pub fn is_regression(&self) -> bool {
        self.analysis
            .as_ref()
            .and_then(|a| a.regression.as_ref())
            .is_some_and(|r| r.is_regression)
    }
}

/// Parse the results JSON a profiler prints.
pub fn results_from_json_str(source: &str) -> Result<CookResults> {
    Ok(serde_json::from_str(source)?)
}
