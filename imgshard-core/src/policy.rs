use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};

pub const DEFAULT_SHARD_SIZE_MB: f64 = 50.0;
pub const DEFAULT_VAL_SPLIT: f64 = 0.2;
pub const DEFAULT_MAX_DEPTH: usize = 4;
/// Class names kept in the status projection of the manifest.
pub const SUMMARY_CLASS_CAP: usize = 50;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Conversion request as it arrives from a caller (JSON body or CLI flags).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset_path: String,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(rename = "shardSizeMB", default = "default_shard_size_mb")]
    pub shard_size_mb: f64,
    #[serde(default = "default_val_split")]
    pub val_split: f64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// When true, zero the manifest timestamp for reproducible output.
    #[serde(default)]
    pub deterministic: bool,
}

fn default_shard_size_mb() -> f64 {
    DEFAULT_SHARD_SIZE_MB
}
fn default_val_split() -> f64 {
    DEFAULT_VAL_SPLIT
}
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl ConvertRequest {
    pub fn new(project_id: impl Into<String>, dataset_path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_path: dataset_path.into(),
            bucket: None,
            shard_size_mb: DEFAULT_SHARD_SIZE_MB,
            val_split: DEFAULT_VAL_SPLIT,
            max_depth: DEFAULT_MAX_DEPTH,
            deterministic: false,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ShardError::Config(format!("{}: {e}", path.display())))
    }

    /// Check every field and produce the options the pipeline runs with.
    pub fn validate(&self) -> Result<ConvertOptions> {
        if self.project_id.trim().is_empty() {
            return Err(ShardError::Config("projectId is required".into()));
        }
        if self.dataset_path.trim().is_empty() {
            return Err(ShardError::Config("datasetPath is required".into()));
        }
        if !self.shard_size_mb.is_finite() || self.shard_size_mb < 0.0 {
            return Err(ShardError::Config(format!(
                "shardSizeMB must be a non-negative number, got {}",
                self.shard_size_mb
            )));
        }
        if !(0.0..=1.0).contains(&self.val_split) {
            return Err(ShardError::Config(format!(
                "valSplit must be within [0, 1], got {}",
                self.val_split
            )));
        }
        Ok(ConvertOptions {
            shard_size_mb: self.shard_size_mb,
            val_split: self.val_split,
            max_depth: self.max_depth,
            deterministic: self.deterministic,
            remote_prefix: remote_prefix_for(&self.dataset_path),
        })
    }
}

/// Validated settings for one conversion run.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    pub shard_size_mb: f64,
    pub val_split: f64,
    pub max_depth: usize,
    pub deterministic: bool,
    /// Key prefix the finished files are uploaded under.
    pub remote_prefix: String,
}

impl ConvertOptions {
    pub fn shard_size_bytes(&self) -> u64 {
        (self.shard_size_mb * BYTES_PER_MB) as u64
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            shard_size_mb: DEFAULT_SHARD_SIZE_MB,
            val_split: DEFAULT_VAL_SPLIT,
            max_depth: DEFAULT_MAX_DEPTH,
            deterministic: false,
            remote_prefix: "shards".into(),
        }
    }
}

/// Shards live next to the uploaded archive: `a/b/images.zip` -> `a/b/shards`.
/// A path without any `/` keeps its whole value as the head: `x.zip` -> `x.zip/shards`.
pub fn remote_prefix_for(dataset_path: &str) -> String {
    let head = dataset_path
        .rsplit_once('/')
        .map_or(dataset_path, |(parent, _)| parent);
    format!("{head}/shards")
}
