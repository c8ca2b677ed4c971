#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use zip::write::SimpleFileOptions;

use imgshard_core::error::{Result, ShardError};
use imgshard_core::sink::store::BlobStore;
use imgshard_core::sink::{ProgressSink, StatusUpdate};

/// Header-only PNG of the given size; `seed` makes contents unique.
pub fn png_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut v = Vec::with_capacity(64);
    v.extend_from_slice(b"\x89PNG\r\n\x1a\n");
    v.extend_from_slice(&13u32.to_be_bytes());
    v.extend_from_slice(b"IHDR");
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&[8, 2, 0, 0, 0, 0, 0, 0, 0]);
    v.extend_from_slice(&seed.to_le_bytes());
    v.extend_from_slice(&[0u8; 28]);
    v
}

/// `count` images named `{class}_{i}.png` under `dir/class`.
pub fn make_class(dir: &Path, class: &str, count: u32, seed_base: u32) {
    let d = dir.join(class);
    fs::create_dir_all(&d).unwrap();
    for i in 0..count {
        fs::write(
            d.join(format!("{class}_{i:03}.png")),
            png_bytes(32, 24, seed_base + i),
        )
        .unwrap();
    }
}

pub fn build_zip(zip_path: &Path, src_root: &Path) {
    let mut zw = zip::ZipWriter::new(File::create(zip_path).unwrap());
    for e in walkdir::WalkDir::new(src_root).sort_by_file_name() {
        let e = e.unwrap();
        let rel = e.path().strip_prefix(src_root).unwrap();
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy().replace('\\', "/");
        if e.file_type().is_dir() {
            zw.add_directory(format!("{name}/"), SimpleFileOptions::default()).unwrap();
        } else {
            zw.start_file(name, SimpleFileOptions::default()).unwrap();
            zw.write_all(&fs::read(e.path()).unwrap()).unwrap();
        }
    }
    zw.finish().unwrap();
}

#[derive(Default)]
pub struct RecordingSink(pub Mutex<Vec<StatusUpdate>>);

impl RecordingSink {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.0.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.updates()
            .into_iter()
            .filter_map(|u| match u {
                StatusUpdate::Converting { progress } | StatusUpdate::Progress(progress) => {
                    Some(progress)
                }
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn update(&self, update: &StatusUpdate) -> Result<()> {
        self.0.lock().unwrap().push(update.clone());
        Ok(())
    }
}

pub struct BrokenSink;

impl ProgressSink for BrokenSink {
    fn update(&self, _update: &StatusUpdate) -> Result<()> {
        Err(ShardError::Sink("document store unavailable".into()))
    }
}

pub struct BrokenStore;

impl BlobStore for BrokenStore {
    fn upload(&self, _local: &Path, key: &str) -> Result<()> {
        Err(ShardError::Upload {
            key: key.to_string(),
            message: "bucket unreachable".into(),
        })
    }
}
