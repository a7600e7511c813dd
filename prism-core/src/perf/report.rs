//! HTML report of per-story profiling results.
//!
//! # Layout
//!
//! One table row per result, sorted by scenario name:
//!
//! | Kind | Story | `<baseline>` TPI | TPI | Iterations | PR Ticks |
//!
//! TPI is ticks per iteration. The baseline column repeats the TPI of the
//! kind's baseline story so each story can be compared against it; the
//! baseline story itself gets no row.
//!
//! Numeric cells link to the profiler's artifacts: an error log wins over a
//! flamegraph, and a cell with neither shows the plain value.

use std::path::Path;

use tracing::debug;

use super::config::{PerfConfig, DEFAULT_TICKS_HELP_URL};
use super::results::{CookResult, CookResults};
use super::scenario::{scenario_name, ScenarioKey};
use super::stories::StoryCatalog;

/// Rendered when no result qualifies for the table.
pub const NO_RESULTS: &str = "<p>No significant results to display.</p>";

const SIGNIFICANT_DIGITS: i32 = 2;
const MISSING: &str = "n/a";

/// One rendered table row. Numeric cells hold finished HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub kind: String,
    pub story: String,
    pub baseline_tpi: String,
    pub tpi: String,
    pub iterations: u32,
    pub ticks: String,
}

pub struct ReportBuilder<'a> {
    catalog: &'a StoryCatalog,
    results: &'a CookResults,
    baseline_story: String,
    default_iterations: u32,
    show_all: bool,
    ticks_help_url: String,
}

impl<'a> ReportBuilder<'a> {
    /// A builder with the default settings.
    pub fn new(catalog: &'a StoryCatalog, results: &'a CookResults) -> Self {
        Self {
            catalog,
            results,
            baseline_story: "Fabric".to_string(),
            default_iterations: 1,
            show_all: true,
            ticks_help_url: DEFAULT_TICKS_HELP_URL.to_string(),
        }
    }

    /// A builder with the settings taken from `config`.
    pub fn from_config(
        catalog: &'a StoryCatalog,
        results: &'a CookResults,
        config: &PerfConfig,
    ) -> Self {
        Self::new(catalog, results)
            .baseline_story(&config.baseline_story)
            .default_iterations(config.default_iterations)
            .show_all(config.show_all)
            .ticks_help_url(&config.ticks_help_url)
    }

    /// Story used as the comparison column.
    pub fn baseline_story(mut self, story: &str) -> Self {
        self.baseline_story = story.to_string();
        self
    }

    /// Iterations assumed for stories that declare none.
    pub fn default_iterations(mut self, iterations: u32) -> Self {
        self.default_iterations = iterations;
        self
    }

    /// When false, only results flagged as regressions are listed.
    pub fn show_all(mut self, show_all: bool) -> Self {
        self.show_all = show_all;
        self
    }

    /// Link target of the ticks column header.
    pub fn ticks_help_url(mut self, url: &str) -> Self {
        self.ticks_help_url = url.to_string();
        self
    }

    /// Report rows in scenario order, baseline story excluded.
    pub fn rows(&self) -> Vec<ReportRow> {
        self.results
            .iter()
            .filter(|(_, result)| self.show_all || result.is_regression())
            .filter_map(|(name, result)| {
                let key = ScenarioKey::parse(name);
                if key.story == self.baseline_story {
                    return None;
                }
                Some(self.row(key, result))
            })
            .collect()
    }

    fn row(&self, key: ScenarioKey<'_>, result: &CookResult) -> ReportRow {
        let ScenarioKey { kind, story } = key;
        ReportRow {
            kind: kind.to_string(),
            story: story.to_string(),
            baseline_tpi: self.tpi_cell(kind, &self.baseline_story).unwrap_or_default(),
            tpi: self
                .tpi_cell(kind, story)
                .unwrap_or_else(|| MISSING.to_string()),
            iterations: self.iterations(kind, story),
            ticks: linkify(Some(result), result.ticks().map(|ticks| ticks.to_string())),
        }
    }

    fn iterations(&self, kind: &str, story: &str) -> u32 {
        self.catalog.iterations(kind, story, self.default_iterations)
    }

    /// TPI cell for a catalog story, or `None` if the catalog lacks it.
    fn tpi_cell(&self, kind: &str, story: &str) -> Option<String> {
        if !self.catalog.contains(kind, story) {
            return None;
        }

        let result = self.results.get(&scenario_name(kind, story));
        let iterations = self.iterations(kind, story);
        let tpi = result
            .and_then(CookResult::ticks)
            .filter(|ticks| *ticks > 0 && iterations > 0)
            .map(|ticks| format_significant(ticks as f64 / f64::from(iterations)));

        Some(linkify(result, tpi))
    }

    /// Render the report fragment.
    pub fn render(&self) -> String {
        let rows = self.rows();
        debug!(rows = rows.len(), show_all = self.show_all, "rendering perf report");

        if rows.is_empty() {
            return NO_RESULTS.to_string();
        }

        let mut html = String::new();
        html.push_str("<table>\n<tr>\n");
        html.push_str("  <th>Kind</th>\n  <th>Story</th>\n");
        html.push_str(&format!(
            "  <th>{} TPI</th>\n",
            html_escape(&self.baseline_story)
        ));
        html.push_str("  <th>TPI</th>\n  <th>Iterations</th>\n");
        html.push_str(&format!(
            "  <th><a href=\"{}\">PR Ticks</a></th>\n",
            html_escape(&self.ticks_help_url)
        ));
        html.push_str("</tr>\n");

        for row in &rows {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&row.kind),
                html_escape(&row.story),
                row.baseline_tpi,
                row.tpi,
                row.iterations,
                row.ticks
            ));
        }

        html.push_str("</table>");
        html
    }
}

fn html_escape(value: &str) -> String {
    v_htmlescape::escape(value).to_string()
}

fn artifact_href(path: &str) -> String {
    let name = Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned());
    html_escape(&name)
}

fn linkify(result: Option<&CookResult>, content: Option<String>) -> String {
    let content = content.unwrap_or_else(|| MISSING.to_string());
    let Some(result) = result else {
        return content;
    };

    if let Some(error_file) = result.error_artifact() {
        format!("<a href=\"{}\">err</a>", artifact_href(error_file))
    } else if let Some(flamegraph) = result.flamegraph_artifact() {
        format!("<a href=\"{}\">{content}</a>", artifact_href(flamegraph))
    } else {
        content
    }
}

/// Format with at most two significant digits, thousands grouped with
/// commas and no trailing zeros: `1234.0` gives `"1,200"`, `0.1234` gives
/// `"0.12"`, `10.0` gives `"10"`.
pub fn format_significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(magnitude - (SIGNIFICANT_DIGITS - 1));
    let rounded = (value / scale).round() * scale;
    let decimals = (SIGNIFICANT_DIGITS - 1 - magnitude).max(0) as usize;
    let fixed = format!("{:.*}", decimals, rounded);

    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int_part),
    };

    let mut out = String::from(sign);
    out.push_str(&group_thousands(digits));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---- Tests ----
