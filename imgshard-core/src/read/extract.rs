use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Result, ShardError};

/// Unpack every entry of `archive` under `dest`. Returns the number of files
/// written. Entries whose names would land outside `dest` abort the run.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<u64> {
    let f = File::open(archive)?;
    let mut zip = ZipArchive::new(BufReader::new(f))
        .map_err(|e| ShardError::Archive(format!("{}: {e}", archive.display())))?;
    fs::create_dir_all(dest)?;

    let mut files = 0u64;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| ShardError::Archive(format!("entry #{i}: {e}")))?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(ShardError::Archive(format!(
                "unsafe path: {}",
                entry.name()
            )));
        };
        let outp = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&outp)?;
            continue;
        }
        if let Some(parent) = outp.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&outp)?;
        io::copy(&mut entry, &mut out)?;
        files += 1;
    }
    tracing::info!(files, archive = %archive.display(), "archive extracted");
    Ok(files)
}
