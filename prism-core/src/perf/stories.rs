//! Story catalog.
//!
//! The catalog lists every story, grouped by kind, together with optional
//! iteration counts. It is produced by the component library's story build
//! as JSON:
//!
//! ```json
//! {
//!   "Button": {
//!     "default": { "iterations": 5000 },
//!     "Default": {},
//!     "Fabric": { "iterations": 1000 }
//!   }
//! }
//! ```
//!
//! The `default` entry of a kind carries kind-level metadata and is not a
//! story.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Key of the kind-level metadata entry.
const KIND_DEFAULTS_KEY: &str = "default";

/// Metadata attached to a story or to a kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryMeta {
    pub iterations: Option<u32>,
}

impl StoryMeta {
    /// Metadata declaring `iterations` runs.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: Some(iterations),
        }
    }

    /// Declared iterations, with zero treated as undeclared.
    fn declared_iterations(&self) -> Option<u32> {
        self.iterations.filter(|n| *n > 0)
    }
}

/// Stories of one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct KindEntry {
    defaults: Option<StoryMeta>,
    stories: BTreeMap<String, StoryMeta>,
}

/// Stories grouped by kind, as listed in `stories.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryCatalog {
    kinds: BTreeMap<String, KindEntry>,
}

impl StoryCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog. A story named `default` holds its kind's metadata.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, StoryMeta>> = serde_json::from_str(source)?;
        Ok(Self::from_raw(raw))
    }

    /// Read and parse a catalog file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    fn from_raw(raw: BTreeMap<String, BTreeMap<String, StoryMeta>>) -> Self {
        let kinds = raw
            .into_iter()
            .map(|(kind, mut stories)| {
                let defaults = stories.remove(KIND_DEFAULTS_KEY);
                (kind, KindEntry { defaults, stories })
            })
            .collect();
        Self { kinds }
    }

    /// Add or replace a story.
    pub fn insert_story(&mut self, kind: &str, story: &str, meta: StoryMeta) {
        self.kinds
            .entry(kind.to_string())
            .or_default()
            .stories
            .insert(story.to_string(), meta);
    }

    /// Set the kind-level metadata.
    pub fn set_kind_defaults(&mut self, kind: &str, meta: StoryMeta) {
        self.kinds.entry(kind.to_string()).or_default().defaults = Some(meta);
    }

    /// Whether the catalog lists `story` under `kind`.
    pub fn contains(&self, kind: &str, story: &str) -> bool {
        self.kinds
            .get(kind)
            .is_some_and(|entry| entry.stories.contains_key(story))
    }

    /// Iteration count for a story.
    ///
    /// The most local declaration wins: the story's own count, then the
    /// kind's default, then `global_default`.
    pub fn iterations(&self, kind: &str, story: &str, global_default: u32) -> u32 {
        let Some(entry) = self.kinds.get(kind) else {
            return global_default;
        };

        entry
            .stories
            .get(story)
            .and_then(StoryMeta::declared_iterations)
            .or_else(|| entry.defaults.as_ref().and_then(StoryMeta::declared_iterations))
            .unwrap_or(global_default)
    }

    /// Every `(kind, story)` pair in sorted order.
    pub fn stories(&self) -> impl Iterator<Item = (&str, &str)> {
        self.kinds.iter().flat_map(|(kind, entry)| {
            entry
                .stories
                .keys()
                .map(move |story| (kind.as_str(), story.as_str()))
        })
    }

    /// Number of stories across every kind.
    pub fn story_count(&self) -> usize {
        self.kinds.values().map(|entry| entry.stories.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "Button": {
            "default": { "iterations": 50 },
            "Default": {},
            "Primary": { "iterations": 7 },
            "Fabric": { "iterations": 0 }
        },
        "Checkbox": {
            "Rtl": {}
        }
    }"#;

    #[test]
    fn default_entry_is_not_a_story() {
        let catalog = StoryCatalog::from_json_str(CATALOG).unwrap();

        assert!(catalog.contains("Button", "Default"));
        assert!(!catalog.contains("Button", "default"));
        assert_eq!(catalog.story_count(), 4);
    }

    #[test]
    fn iterations_prefer_most_local_declaration() {
        let catalog = StoryCatalog::from_json_str(CATALOG).unwrap();

        assert_eq!(catalog.iterations("Button", "Primary", 1), 7);
        assert_eq!(catalog.iterations("Button", "Default", 1), 50);
        assert_eq!(catalog.iterations("Checkbox", "Rtl", 3), 3);
        assert_eq!(catalog.iterations("Missing", "Story", 2), 2);
    }

    #[test]
    fn zero_iterations_count_as_undeclared() {
        let catalog = StoryCatalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.iterations("Button", "Fabric", 1), 50);
    }

    #[test]
    fn stories_iterate_in_sorted_order() {
        let catalog = StoryCatalog::from_json_str(CATALOG).unwrap();
        let stories: Vec<_> = catalog.stories().collect();

        assert_eq!(
            stories,
            vec![
                ("Button", "Default"),
                ("Button", "Fabric"),
                ("Button", "Primary"),
                ("Checkbox", "Rtl"),
            ]
        );
    }

    #[test]
    fn builder_methods() {
        let mut catalog = StoryCatalog::new();
        catalog.set_kind_defaults("A", StoryMeta::with_iterations(4));
        catalog.insert_story("A", "Default", StoryMeta::default());

        assert!(catalog.contains("A", "Default"));
        assert_eq!(catalog.iterations("A", "Default", 1), 4);
    }
}
