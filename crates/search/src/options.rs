//! Per-query read options

use verity_core::SelectFieldMapping;

/// Options for one entity query
///
/// Unset options fall back to the store configuration or the query itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Return stale-but-present entities using the store's current data
    /// instead of dropping them and repairing the index
    pub keep_stale_entries: Option<bool>,
    /// Field selection overriding the query's own
    pub projection: Option<Vec<SelectFieldMapping>>,
}

impl ReadOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stale-entry policy for this query
    pub fn keep_stale_entries(mut self, keep: bool) -> Self {
        self.keep_stale_entries = Some(keep);
        self
    }

    /// Set the field selection for this query
    pub fn projection(mut self, mappings: Vec<SelectFieldMapping>) -> Self {
        self.projection = Some(mappings);
        self
    }

    /// Effective stale-entry policy given the configured default
    pub fn resolve_keep_stale(&self, default: bool) -> bool {
        self.keep_stale_entries.unwrap_or(default)
    }
}
