//! Pipeline configuration via `hyperload.toml`
//!
//! Every field has a default, so an empty file is a valid configuration.
//! [`PipelineConfig::write_default_if_missing`] drops a commented template
//! next to the data; edit it and rerun the load.

use hyperload_core::limits::{DEFAULT_BLOCK_SIZE, DEFAULT_STORE_TIMEOUT_SECS};
use hyperload_core::{BlockLimits, Error, KvCollection, Result};
use hyperload_storage::sort::DEFAULT_RUN_LINES;
use hyperload_storage::TempFiles;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "hyperload.toml";

/// Smallest accepted base block size; targets collections get a quarter of it
pub const MIN_BLOCK_SIZE: usize = 4;

/// Default documents per `insert_many` call
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 10_000;

/// Default highest link arity indexed by the pattern builder
pub const DEFAULT_MAX_PATTERN_ARITY: usize = 3;

/// Pipeline configuration loaded from `hyperload.toml`.
///
/// # Example
///
/// ```toml
/// temp_dir = "/var/tmp/hyperload"
/// block_size = 500000
/// update = false
/// pattern_exclusions = ["Typedef"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the `{collection}.txt` temporary files
    pub temp_dir: PathBuf,
    /// Base number of values per stored KV value
    pub block_size: usize,
    /// Timeout applied to every KV store call, in seconds
    pub store_timeout_secs: u64,
    /// Swallow duplicate-key errors from document inserts
    pub allow_duplicates: bool,
    /// Merge into values already in the KV store instead of overwriting
    pub update: bool,
    /// Documents per `insert_many` call
    pub insert_batch_size: usize,
    /// Lines held in memory per external-sort run
    pub sort_run_lines: usize,
    /// Links with more targets than this are not pattern-indexed
    pub max_pattern_arity: usize,
    /// Named types never pattern-indexed
    pub pattern_exclusions: Vec<String>,
    /// Leave the sorted temporary files on disk after a successful load
    pub keep_temp_files: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("hyperload"),
            block_size: DEFAULT_BLOCK_SIZE,
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            allow_duplicates: false,
            update: false,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
            sort_run_lines: DEFAULT_RUN_LINES,
            max_pattern_arity: DEFAULT_MAX_PATTERN_ARITY,
            pattern_exclusions: Vec::new(),
            keep_temp_files: true,
        }
    }
}

impl PipelineConfig {
    /// Config rooted at `temp_dir`, defaults elsewhere
    pub fn in_dir(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            ..Self::default()
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Hyperload pipeline configuration
#
# Directory for the per-collection temporary files (default: system temp dir)
# temp_dir = "/var/tmp/hyperload"

# Values per stored KV value before a key is split into chunks.
# Collections whose values carry targets (patterns, templates) use a quarter.
block_size = 500000

# Timeout for every KV store call, in seconds
store_timeout_secs = 100

# Swallow duplicate-key errors from document inserts instead of logging them
allow_duplicates = false

# Merge into existing KV values instead of overwriting them.
# Only valid when no key spans more than one block.
update = false

# Documents per insert_many call
insert_batch_size = 10000

# Lines sorted in memory per external-sort run
sort_run_lines = 1000000

# Links with more targets than this are not pattern-indexed
max_pattern_arity = 3

# Named types never pattern-indexed
pattern_exclusions = []

# Keep the sorted temporary files after a successful load
keep_temp_files = true
"#
    }

    /// Read, parse, and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: PipelineConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(Error::Config(format!(
                "block_size must be at least {}, got {}",
                MIN_BLOCK_SIZE, self.block_size
            )));
        }
        if self.insert_batch_size == 0 {
            return Err(Error::Config("insert_batch_size must be at least 1".into()));
        }
        if self.sort_run_lines == 0 {
            return Err(Error::Config("sort_run_lines must be at least 1".into()));
        }
        if self.store_timeout_secs == 0 {
            return Err(Error::Config("store_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Per-call store timeout
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Block limits derived from `block_size`
    pub fn block_limits(&self) -> BlockLimits {
        BlockLimits::new(self.block_size)
    }

    /// Values per stored block for `collection`
    pub fn block_size_for(&self, collection: KvCollection) -> usize {
        self.block_limits().block_size_for(collection)
    }

    /// Temporary file map rooted at `temp_dir`
    pub fn temp_files(&self) -> TempFiles {
        TempFiles::in_dir(&self.temp_dir)
    }
}
