use std::path::Path;

use crate::error::Result;
use crate::read::reader::ShardReader;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordRow {
    pub filename: String,
    pub label: i64,
    pub image_bytes: u64,
}

/// One row per record of a shard file, in file order.
pub fn list(shard: &Path) -> Result<Vec<RecordRow>> {
    ShardReader::open(shard)?
        .map(|rec| {
            rec.map(|r| RecordRow {
                image_bytes: r.image.len() as u64,
                filename: r.filename,
                label: r.label,
            })
        })
        .collect()
}
