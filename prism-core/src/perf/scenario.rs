//! Scenarios submitted to the profiler.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::stories::StoryCatalog;

/// Scenarios keyed by name, in sorted order.
pub type Scenarios = BTreeMap<String, Scenario>;

/// One profiling run: the page the profiler loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(rename = "scenario")]
    pub url: String,
}

/// Scenario name split into kind and story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioKey<'a> {
    pub kind: &'a str,
    pub story: &'a str,
}

impl<'a> ScenarioKey<'a> {
    /// Split `"<kind>.<story>"`. Segments past the second are ignored and a
    /// missing story is empty.
    pub fn parse(name: &'a str) -> Self {
        let mut parts = name.split('.');
        let kind = parts.next().unwrap_or_default();
        let story = parts.next().unwrap_or_default();
        Self { kind, story }
    }

    /// The `"<kind>.<story>"` name.
    pub fn name(&self) -> String {
        scenario_name(self.kind, self.story)
    }
}

impl fmt::Display for ScenarioKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.story)
    }
}

/// Name of the scenario for one story.
pub fn scenario_name(kind: &str, story: &str) -> String {
    format!("{kind}.{story}")
}

/// URL that renders one story `iterations` times.
pub fn generate_url(base: &str, kind: &str, story: &str, iterations: u32) -> String {
    format!("{base}?kind={kind}&story={story}&iterations={iterations}")
}

/// One scenario per catalog story.
pub fn build_scenarios(catalog: &StoryCatalog, base_url: &str, default_iterations: u32) -> Scenarios {
    catalog
        .stories()
        .map(|(kind, story)| {
            let iterations = catalog.iterations(kind, story, default_iterations);
            (
                scenario_name(kind, story),
                Scenario {
                    url: generate_url(base_url, kind, story, iterations),
                },
            )
        })
        .collect()
}
