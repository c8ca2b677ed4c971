//! Status side channel. The pipeline reports milestones here but never
//! depends on a report succeeding.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::container::manifest::{ManifestSummary, PerSplit};
use crate::error::{Result, ShardError};

pub mod store;

/// Final payload handed to the sink on success.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub shard_paths: PerSplit<Vec<String>>,
    pub shard_metadata: ManifestSummary,
    pub shards_prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Converting { progress: u8 },
    Progress(u8),
    Completed(Completion),
    Failed { error: String },
}

pub trait ProgressSink: Send + Sync {
    fn update(&self, update: &StatusUpdate) -> Result<()>;
}

/// Discards every update.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _update: &StatusUpdate) -> Result<()> {
        Ok(())
    }
}

/// Reports through `tracing`.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, update: &StatusUpdate) -> Result<()> {
        match update {
            StatusUpdate::Converting { progress } | StatusUpdate::Progress(progress) => {
                tracing::info!(progress = *progress, "conversion progress")
            }
            StatusUpdate::Completed(c) => tracing::info!(
                train = c.shard_metadata.train_samples,
                val = c.shard_metadata.val_samples,
                test = c.shard_metadata.test_samples,
                prefix = %c.shards_prefix,
                "conversion completed"
            ),
            StatusUpdate::Failed { error } => tracing::error!(%error, "conversion failed"),
        }
        Ok(())
    }
}

/// Keeps one JSON status document on disk, merging each update into it.
pub struct JsonFileSink {
    path: PathBuf,
    doc: Mutex<Map<String, Value>>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fields(update: &StatusUpdate) -> Result<Map<String, Value>> {
        let v = match update {
            StatusUpdate::Converting { progress } => json!({
                "conversionStatus": "converting",
                "conversionProgress": progress,
            }),
            StatusUpdate::Progress(p) => json!({ "conversionProgress": p }),
            StatusUpdate::Completed(c) => {
                let mut v = serde_json::to_value(c)
                    .map_err(|e| ShardError::Sink(format!("encode completion: {e}")))?;
                v["conversionStatus"] = json!("completed");
                v["conversionProgress"] = json!(100);
                v
            }
            StatusUpdate::Failed { error } => json!({
                "conversionStatus": "failed",
                "conversionError": error,
            }),
        };
        match v {
            Value::Object(m) => Ok(m),
            _ => Err(ShardError::Sink("status update is not an object".into())),
        }
    }
}

impl ProgressSink for JsonFileSink {
    fn update(&self, update: &StatusUpdate) -> Result<()> {
        let fields = Self::fields(update)?;
        let mut doc = self
            .doc
            .lock()
            .map_err(|e| ShardError::Sink(e.to_string()))?;
        doc.extend(fields);
        let bytes = serde_json::to_vec_pretty(&*doc)
            .map_err(|e| ShardError::Sink(format!("encode status: {e}")))?;
        std::fs::write(&self.path, bytes)
            .map_err(|e| ShardError::Sink(format!("{}: {e}", self.path.display())))
    }
}
