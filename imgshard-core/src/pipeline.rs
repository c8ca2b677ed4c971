//! End-to-end conversion: extracted tree in, shards + manifest out.
//!
//! Side channels are injected. Progress reports are best effort; an upload
//! failure is reported as [`ShardError::Upload`] so callers can tell it apart
//! from a failed conversion, and the local output stays in place.

use std::fs;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::container::header::parse_shard_file_name;
use crate::container::manifest::{MANIFEST_FILE, Manifest, ManifestInputs};
use crate::error::{Result, ShardError};
use crate::index::classes::{IndexedDataset, index_dataset, probe_dimensions};
use crate::layout::resolver::{Resolution, ResolvedLayout, resolve};
use crate::pack::writer::{ShardSet, ShardWriter};
use crate::policy::{ConvertOptions, ConvertRequest, SUMMARY_CLASS_CAP};
use crate::read::extract::extract_zip;
use crate::sink::store::BlobStore;
use crate::sink::{Completion, NullSink, ProgressSink, StatusUpdate};
use crate::split::planner::{Split, SplitSet, plan};
use crate::util::cancel::CancelToken;

pub const PROGRESS_EXTRACTED: u8 = 10;
pub const PROGRESS_SPLIT: u8 = 50;
pub const PROGRESS_TRAIN_WRITTEN: u8 = 70;
pub const PROGRESS_EVAL_WRITTEN: u8 = 80;
pub const PROGRESS_UPLOADED: u8 = 95;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub manifest: Manifest,
    pub layout: ResolvedLayout,
    pub out_dir: PathBuf,
    /// Shard files followed by the manifest, as written to `out_dir`.
    pub files: Vec<String>,
    /// Keys the files were uploaded under; empty without a store.
    pub uploaded: Vec<String>,
    pub remote_prefix: String,
}

pub struct Converter<'a> {
    sink: &'a dyn ProgressSink,
    store: Option<&'a dyn BlobStore>,
    cancel: CancelToken,
}

impl Default for Converter<'_> {
    fn default() -> Self {
        Self::new(&NullSink)
    }
}

impl<'a> Converter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            store: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_store(mut self, store: &'a dyn BlobStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn notify(&self, update: StatusUpdate) {
        if let Err(e) = self.sink.update(&update) {
            tracing::warn!(error = %e, "status update dropped");
        }
    }

    fn checkpoint(&self, progress: u8) -> Result<()> {
        self.notify(StatusUpdate::Progress(progress));
        if self.cancel.is_cancelled() {
            return Err(ShardError::Cancelled);
        }
        Ok(())
    }

    /// Extract `archive` into a scratch directory and convert it.
    pub fn convert_archive(
        &self,
        archive: &Path,
        out_dir: &Path,
        req: &ConvertRequest,
    ) -> Result<ConversionReport> {
        let opts = req.validate()?;
        self.notify(StatusUpdate::Converting { progress: 0 });
        let res = tempfile::Builder::new()
            .prefix("imgshard-extract")
            .tempdir()
            .map_err(ShardError::from)
            .and_then(|scratch| {
                extract_zip(archive, scratch.path())?;
                self.checkpoint(PROGRESS_EXTRACTED)?;
                self.run(scratch.path(), out_dir, &opts)
            });
        self.finish(res)
    }

    /// Convert an already extracted directory tree.
    pub fn convert_dir(
        &self,
        root: &Path,
        out_dir: &Path,
        req: &ConvertRequest,
    ) -> Result<ConversionReport> {
        let opts = req.validate()?;
        self.notify(StatusUpdate::Converting { progress: 0 });
        let res = self
            .checkpoint(PROGRESS_EXTRACTED)
            .and_then(|_| self.run(root, out_dir, &opts));
        self.finish(res)
    }

    fn finish(&self, res: Result<ConversionReport>) -> Result<ConversionReport> {
        match &res {
            Ok(report) => {
                self.notify(StatusUpdate::Completed(Completion {
                    shard_paths: report.manifest.shard_paths.clone(),
                    shard_metadata: report.manifest.summary(SUMMARY_CLASS_CAP),
                    shards_prefix: report.remote_prefix.clone(),
                }));
            }
            Err(e) => {
                tracing::error!(error = %e, "conversion failed");
                self.notify(StatusUpdate::Failed {
                    error: e.to_string(),
                });
            }
        }
        res
    }

    fn run(&self, root: &Path, out_dir: &Path, opts: &ConvertOptions) -> Result<ConversionReport> {
        let layout = match resolve(root, opts.max_depth)? {
            Resolution::Found(l) => l,
            Resolution::NotFound => {
                return Err(ShardError::StructureNotFound {
                    root: root.to_path_buf(),
                    max_depth: opts.max_depth,
                });
            }
        };

        let IndexedDataset {
            classes,
            train,
            test,
            probe,
        } = index_dataset(&layout.train_root, layout.test_root.as_deref())?;
        let dimensions = probe.as_deref().map(probe_dimensions).unwrap_or((0, 0));

        let test = layout.test_root.as_ref().map(|_| test);
        let splits = plan(train, test, opts.val_split);
        tracing::info!(
            train = splits.train.len(),
            val = splits.val.len(),
            test = splits.test.len(),
            "splits planned"
        );
        self.checkpoint(PROGRESS_SPLIT)?;

        fs::create_dir_all(out_dir)?;
        // dropped (and removed) on any error before the shards are moved out
        let staging = tempfile::Builder::new()
            .prefix(".imgshard-staging")
            .tempdir_in(out_dir)?;
        let shard_sets = self.write_splits(staging.path(), &splits, opts.shard_size_bytes())?;

        let created_at = if opts.deterministic {
            0
        } else {
            OffsetDateTime::now_utc().unix_timestamp()
        };
        let manifest = Manifest::build(ManifestInputs {
            classes: &classes,
            shard_sets: &shard_sets,
            dimensions,
            shard_size_mb: opts.shard_size_mb,
            created_at,
        });
        manifest.write_to(staging.path())?;

        let mut files: Vec<String> = manifest.all_shards().map(|(_, n)| n.to_string()).collect();
        files.push(MANIFEST_FILE.to_string());
        clear_previous_outputs(out_dir)?;
        for name in &files {
            fs::rename(staging.path().join(name), out_dir.join(name))?;
        }
        staging.close()?;

        let uploaded = self.upload(out_dir, &files, &opts.remote_prefix)?;
        self.notify(StatusUpdate::Progress(PROGRESS_UPLOADED));

        Ok(ConversionReport {
            manifest,
            layout,
            out_dir: out_dir.to_path_buf(),
            files,
            uploaded,
            remote_prefix: opts.remote_prefix.clone(),
        })
    }

    fn write_splits(&self, dir: &Path, splits: &SplitSet, threshold: u64) -> Result<Vec<ShardSet>> {
        let writer = |split: Split| -> Result<ShardSet> {
            let samples = splits.get(split);
            if samples.is_empty() {
                return Ok(ShardSet::empty(split));
            }
            ShardWriter::new(dir, split, threshold)
                .with_cancel(self.cancel.clone())
                .write(samples)
        };

        let train = writer(Split::Train)?;
        self.checkpoint(PROGRESS_TRAIN_WRITTEN)?;

        // independent index spaces and file names; a test folder suppresses
        // val, so one side is normally the empty early return
        let (val, test) = rayon::join(|| writer(Split::Val), || writer(Split::Test));
        let sets = vec![train, val?, test?];
        self.checkpoint(PROGRESS_EVAL_WRITTEN)?;
        Ok(sets)
    }

    fn upload(&self, out_dir: &Path, files: &[String], prefix: &str) -> Result<Vec<String>> {
        let Some(store) = self.store else {
            return Ok(Vec::new());
        };
        let mut keys = Vec::with_capacity(files.len());
        for name in files {
            let key = format!("{prefix}/{name}");
            store.upload(&out_dir.join(name), &key)?;
            keys.push(key);
        }
        tracing::info!(count = keys.len(), %prefix, "uploaded outputs");
        Ok(keys)
    }
}

/// Remove shards and the manifest of an earlier run so the directory only
/// ever holds one dataset. Unrelated files are left alone.
fn clear_previous_outputs(out_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let stale = name == MANIFEST_FILE
            || parse_shard_file_name(name)
                .is_some_and(|(split, _)| Split::ALL.iter().any(|s| s.as_str() == split));
        if stale {
            tracing::debug!(file = name, "removing previous output");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
