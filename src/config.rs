//! Settings for the Slate language server
//!
//! The only tunable is the per-scan diagnostic cap. Settings come from the
//! editor via `workspace/configuration`, scoped per document URI; the
//! process-wide default applies when the client has no per-scope
//! configuration support or a fetch fails.

use serde::Deserialize;
use std::collections::HashMap;

/// Default diagnostic cap when no client configuration is available
pub const DEFAULT_MAX_PROBLEMS: i64 = 1000;

/// Configuration section name requested from the client
pub const SETTINGS_SECTION: &str = "slate";

/// Per-scope server settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlateSettings {
    pub max_number_of_problems: i64,
}

impl SlateSettings {
    /// The diagnostic cap as an emission count
    pub fn max_problems(&self) -> usize {
        self.max_number_of_problems.max(0) as usize
    }
}

impl Default for SlateSettings {
    fn default() -> Self {
        Self {
            max_number_of_problems: DEFAULT_MAX_PROBLEMS,
        }
    }
}

/// Cache of resolved settings, keyed by document URI.
///
/// Invalidated wholesale when the client signals a configuration change;
/// individual entries are evicted when their document closes.
#[derive(Debug, Default)]
pub struct SettingsCache {
    entries: HashMap<String, SlateSettings>,
}

impl SettingsCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Cached settings for a URI, if resolved
    pub fn get(&self, uri: &str) -> Option<&SlateSettings> {
        self.entries.get(uri)
    }

    /// Store resolved settings for a URI
    pub fn insert(&mut self, uri: String, settings: SlateSettings) {
        self.entries.insert(uri, settings);
    }

    /// Evict one document's entry
    pub fn remove(&mut self, uri: &str) {
        self.entries.remove(uri);
    }

    /// Drop every entry, for all documents
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
