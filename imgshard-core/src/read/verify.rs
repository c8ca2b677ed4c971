use std::path::Path;

use crate::container::manifest::Manifest;
use crate::error::{Result, ShardError};
use crate::read::reader::ShardReader;
use crate::split::planner::Split;
use crate::util::hash_forward::file_digest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardCheck {
    pub split: Split,
    pub name: String,
    pub records: u64,
}

/// Re-hash every shard listed in the manifest of `dir` and decode its records.
pub fn verify(dir: &Path) -> Result<Vec<ShardCheck>> {
    let manifest = Manifest::read_from(dir)?;
    let mut checks = Vec::new();
    let mut totals = [0u64; 3];

    for (split, name) in manifest.all_shards() {
        let path = dir.join(name);
        let want = manifest
            .checksums
            .get(name)
            .ok_or_else(|| ShardError::Format(format!("no checksum recorded for {name}")))?;
        let got = file_digest(&path)?;
        if &got != want {
            return Err(ShardError::Format(format!(
                "checksum mismatch for {name}: manifest {want}, file {got}"
            )));
        }
        let mut records = 0u64;
        for rec in ShardReader::open(&path)? {
            rec?;
            records += 1;
        }
        totals[split as usize] += records;
        checks.push(ShardCheck {
            split,
            name: name.to_string(),
            records,
        });
    }

    let expected = [
        manifest.train_samples,
        manifest.val_samples,
        manifest.test_samples,
    ];
    for split in Split::ALL {
        let i = split as usize;
        if totals[i] != expected[i] {
            return Err(ShardError::Format(format!(
                "{split}: manifest lists {} samples, shards hold {}",
                expected[i], totals[i]
            )));
        }
    }
    Ok(checks)
}
