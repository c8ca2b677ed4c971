use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};
use crate::index::classes::ClassIndex;
use crate::pack::writer::ShardSet;
use crate::split::planner::Split;

pub const MANIFEST_FILE: &str = "metadata.json";
pub const CHECKSUM_ALGORITHM: &str = "blake3";
pub const RECORD_FORMAT: &str = "imgshard-cbor-v1";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PerSplit<T> {
    pub train: T,
    pub val: T,
    pub test: T,
}

impl<T> PerSplit<T> {
    pub fn get(&self, split: Split) -> &T {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    pub fn get_mut(&mut self, split: Split) -> &mut T {
        match split {
            Split::Train => &mut self.train,
            Split::Val => &mut self.val,
            Split::Test => &mut self.test,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub train_samples: u64,
    pub val_samples: u64,
    pub test_samples: u64,
    pub skipped_samples: PerSplit<u64>,
    pub original_width: u32,
    pub original_height: u32,
    pub shard_paths: PerSplit<Vec<String>>,
    pub checksums: BTreeMap<String, String>,
    pub checksum_algorithm: String,
    #[serde(rename = "shardSizeMB")]
    pub shard_size_mb: f64,
    pub record_format: String,
    pub created_at: i64,
}

/// Reduced projection for stores with tight document limits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSummary {
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub train_samples: u64,
    pub val_samples: u64,
    pub test_samples: u64,
    #[serde(rename = "shardSizeMB")]
    pub shard_size_mb: f64,
}

/// Everything the builder aggregates. All values are already computed.
pub struct ManifestInputs<'a> {
    pub classes: &'a ClassIndex,
    pub shard_sets: &'a [ShardSet],
    pub dimensions: (u32, u32),
    pub shard_size_mb: f64,
    pub created_at: i64,
}

impl Manifest {
    pub fn build(inp: ManifestInputs<'_>) -> Self {
        let mut counts = PerSplit::<u64>::default();
        let mut skipped = PerSplit::<u64>::default();
        let mut shard_paths = PerSplit::<Vec<String>>::default();
        let mut checksums = BTreeMap::new();

        for set in inp.shard_sets {
            *counts.get_mut(set.split) += set.records();
            *skipped.get_mut(set.split) += set.skipped;
            shard_paths.get_mut(set.split).extend(set.files());
            checksums.extend(set.checksums());
        }

        Self {
            num_classes: inp.classes.len(),
            class_names: inp.classes.names().to_vec(),
            train_samples: counts.train,
            val_samples: counts.val,
            test_samples: counts.test,
            skipped_samples: skipped,
            original_width: inp.dimensions.0,
            original_height: inp.dimensions.1,
            shard_paths,
            checksums,
            checksum_algorithm: CHECKSUM_ALGORITHM.to_string(),
            shard_size_mb: inp.shard_size_mb,
            record_format: RECORD_FORMAT.to_string(),
            created_at: inp.created_at,
        }
    }

    pub fn summary(&self, class_cap: usize) -> ManifestSummary {
        ManifestSummary {
            num_classes: self.num_classes,
            class_names: self.class_names.iter().take(class_cap).cloned().collect(),
            train_samples: self.train_samples,
            val_samples: self.val_samples,
            test_samples: self.test_samples,
            shard_size_mb: self.shard_size_mb,
        }
    }

    /// Every shard file, train first.
    pub fn all_shards(&self) -> impl Iterator<Item = (Split, &str)> {
        Split::ALL.into_iter().flat_map(move |s| {
            self.shard_paths
                .get(s)
                .iter()
                .map(move |name| (s, name.as_str()))
        })
    }

    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| ShardError::Format(format!("manifest encode: {e}")))?;
        std::fs::write(dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    pub fn read_from(dir: &Path) -> Result<Self> {
        let bytes = std::fs::read(dir.join(MANIFEST_FILE))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ShardError::Format(format!("manifest decode: {e}")))
    }
}
