//! Store configuration via `verity.toml`
//!
//! On first open a default `verity.toml` is written to the data directory.
//! To change settings, edit the file and reopen the store.

use crate::error::{VerityError, VerityResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed in the store data directory.
pub const CONFIG_FILE_NAME: &str = "verity.toml";

/// Largest page size a query may request.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// How hard the file-backed version log pushes appends to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Flush to the OS after every append
    Standard,
    /// fsync after every append
    Always,
}

/// Store configuration loaded from `verity.toml`.
///
/// # Example
///
/// ```toml
/// query_limit = 10
/// keep_stale_entries = false
/// durability = "standard"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerityConfig {
    /// Page size for the candidate producer and reconciler buffering.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
    /// Default for returning stale-but-present entities from entity queries.
    #[serde(default)]
    pub keep_stale_entries: bool,
    /// Version log durability: `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
}

fn default_query_limit() -> usize {
    10
}

fn default_durability_str() -> String {
    "standard".to_string()
}

impl Default for VerityConfig {
    fn default() -> Self {
        Self {
            query_limit: default_query_limit(),
            keep_stale_entries: false,
            durability: default_durability_str(),
        }
    }
}

impl VerityConfig {
    /// Parse the durability string into a `DurabilityMode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"standard"` or `"always"`.
    pub fn durability_mode(&self) -> VerityResult<DurabilityMode> {
        match self.durability.as_str() {
            "standard" => Ok(DurabilityMode::Standard),
            "always" => Ok(DurabilityMode::Always),
            other => Err(VerityError::invalid_input(format!(
                "Invalid durability mode '{}' in verity.toml. Expected \"standard\" or \"always\".",
                other
            ))),
        }
    }

    /// Check every setting.
    pub fn validate(&self) -> VerityResult<()> {
        if self.query_limit == 0 || self.query_limit > MAX_QUERY_LIMIT {
            return Err(VerityError::invalid_input(format!(
                "query_limit must be between 1 and {}, got {}",
                MAX_QUERY_LIMIT, self.query_limit
            )));
        }
        self.durability_mode()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Verity store configuration
#
# Page size used when reading candidates from the secondary index (1..=1000)
query_limit = 10

# Return stale-but-present entities from entity queries instead of dropping
# them and repairing the index (default: false). Queries may override this.
keep_stale_entries = false

# Version log durability: "standard" (default) or "always"
#   "standard" = flush every append, fsync left to the OS
#   "always"   = fsync every append
durability = "standard"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> VerityResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VerityError::storage(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: VerityConfig = toml::from_str(&content).map_err(|e| {
            VerityError::invalid_input(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> VerityResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                VerityError::storage(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> VerityResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VerityError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            VerityError::storage(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
