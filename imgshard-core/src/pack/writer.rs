use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::container::header::{ShardHeader, shard_file_name};
use crate::container::record::encode_sample;
use crate::error::{Result, ShardError};
use crate::index::classes::Sample;
use crate::split::planner::Split;
use crate::util::cancel::CancelToken;
use crate::util::hash_forward::HashingForward;
use crate::util::varint::put_uvarint;

/// One finished shard file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardInfo {
    pub name: String,
    /// Hex BLAKE3 of the complete file.
    pub checksum: String,
    pub records: u64,
    /// Sum of record payload lengths (framing and header excluded).
    pub payload_bytes: u64,
    pub file_bytes: u64,
}

/// Every shard written for one split, in order.
#[derive(Clone, Debug)]
pub struct ShardSet {
    pub split: Split,
    pub shards: Vec<ShardInfo>,
    /// Samples that could not be read or encoded.
    pub skipped: u64,
}

impl ShardSet {
    pub fn empty(split: Split) -> Self {
        Self {
            split,
            shards: Vec::new(),
            skipped: 0,
        }
    }

    pub fn files(&self) -> Vec<String> {
        self.shards.iter().map(|s| s.name.clone()).collect()
    }

    pub fn checksums(&self) -> BTreeMap<String, String> {
        self.shards
            .iter()
            .map(|s| (s.name.clone(), s.checksum.clone()))
            .collect()
    }

    pub fn records(&self) -> u64 {
        self.shards.iter().map(|s| s.records).sum()
    }
}

/// Shard being filled. Bytes go to a temp file next to the final name and
/// only take that name once the shard is closed.
struct OpenShard {
    name: String,
    out: HashingForward<BufWriter<NamedTempFile>>,
    records: u64,
    payload_bytes: u64,
}

impl OpenShard {
    fn create(dir: &Path, name: String) -> Result<Self> {
        let tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(dir)?;
        let mut out = HashingForward::new(BufWriter::new(tmp));
        ShardHeader::default().write_to(&mut out)?;
        Ok(Self {
            name,
            out,
            records: 0,
            payload_bytes: 0,
        })
    }

    fn append(&mut self, payload: &[u8]) -> Result<()> {
        let mut len = Vec::with_capacity(10);
        put_uvarint(&mut len, payload.len() as u64);
        self.out.write_all(&len)?;
        self.out.write_all(payload)?;
        self.records += 1;
        self.payload_bytes += payload.len() as u64;
        Ok(())
    }

    fn close(self, dir: &Path) -> Result<ShardInfo> {
        let file_bytes = self.out.written;
        let (buf, digest) = self.out.finish();
        let tmp = buf.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(&self.name)).map_err(|e| e.error)?;
        Ok(ShardInfo {
            name: self.name,
            checksum: hex::encode(digest.as_bytes()),
            records: self.records,
            payload_bytes: self.payload_bytes,
            file_bytes,
        })
    }
}

/// Packs the samples of one split into `{split}-NNNNN.imgshard` files.
///
/// A shard stays open until the payload bytes appended to it reach
/// `threshold`; the next sample then starts a new shard. The threshold only
/// decides when to roll over, so a single oversized record still lands
/// whole in one shard.
pub struct ShardWriter {
    dir: PathBuf,
    split: Split,
    threshold: u64,
    cancel: CancelToken,
}

impl ShardWriter {
    pub fn new(dir: impl Into<PathBuf>, split: Split, threshold: u64) -> Self {
        Self {
            dir: dir.into(),
            split,
            threshold,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn write(&self, samples: &[Sample]) -> Result<ShardSet> {
        let mut set = ShardSet::empty(self.split);
        let mut open: Option<OpenShard> = None;
        let mut current = 0u64;

        for sample in samples {
            // dropping `open` here removes the partial temp file
            if self.cancel.is_cancelled() {
                return Err(ShardError::Cancelled);
            }

            if open.is_none() || current >= self.threshold {
                if let Some(done) = open.take() {
                    set.shards.push(done.close(&self.dir)?);
                }
                let name = shard_file_name(self.split.as_str(), set.shards.len());
                tracing::info!(shard = %name, "writing shard");
                open = Some(OpenShard::create(&self.dir, name)?);
                current = 0;
            }

            match encode_sample(sample) {
                Ok(payload) => {
                    if let Some(shard) = open.as_mut() {
                        shard.append(&payload)?;
                    }
                    current += payload.len() as u64;
                }
                Err(e) => {
                    tracing::warn!(path = %sample.path.display(), error = %e, "skipping sample");
                    set.skipped += 1;
                }
            }
        }

        if let Some(done) = open.take() {
            set.shards.push(done.close(&self.dir)?);
        }

        tracing::info!(
            split = %self.split,
            shards = set.shards.len(),
            records = set.records(),
            skipped = set.skipped,
            "split written"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::reader::ShardReader;
    use crate::util::hash_forward::file_digest;
    use std::fs;

    fn make_samples(dir: &Path, n: usize, size: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let p = dir.join(format!("img{i:03}.png"));
                let mut bytes = vec![i as u8; size];
                bytes[0] = 0x89;
                fs::write(&p, bytes).unwrap();
                Sample {
                    path: p,
                    label: (i % 2) as u32,
                }
            })
            .collect()
    }

    #[test]
    fn empty_input_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let set = ShardWriter::new(out.path(), Split::Val, 10).write(&[]).unwrap();
        assert!(set.shards.is_empty());
        assert!(set.checksums().is_empty());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn large_threshold_yields_one_shard() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let samples = make_samples(src.path(), 10, 100);
        let set = ShardWriter::new(out.path(), Split::Train, 1 << 20)
            .write(&samples)
            .unwrap();
        assert_eq!(set.files(), vec!["train-00000.imgshard"]);
        assert_eq!(set.records(), 10);
        let names: Vec<_> = ShardReader::open(&out.path().join("train-00000.imgshard"))
            .unwrap()
            .map(|r| r.unwrap().filename)
            .collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "img000.png");
        assert_eq!(names[9], "img009.png");
    }

    #[test]
    fn rollover_happens_at_threshold_not_before() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let samples = make_samples(src.path(), 7, 100);
        let one = crate::container::record::encode_sample(&samples[0]).unwrap().len() as u64;
        // room for exactly three records before the size reaches the threshold
        let set = ShardWriter::new(out.path(), Split::Train, 3 * one)
            .write(&samples)
            .unwrap();
        let counts: Vec<_> = set.shards.iter().map(|s| s.records).collect();
        assert_eq!(counts, vec![3, 3, 1]);
        for s in &set.shards[..2] {
            assert!(s.payload_bytes >= 3 * one);
        }
    }

    #[test]
    fn tiny_threshold_gives_one_record_per_shard() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let samples = make_samples(src.path(), 5, 64);
        let set = ShardWriter::new(out.path(), Split::Test, 1)
            .write(&samples)
            .unwrap();
        assert_eq!(set.shards.len(), 5);
        assert!(set.shards.iter().all(|s| s.records == 1));
        assert_eq!(set.files()[4], "test-00004.imgshard");
        let distinct: std::collections::BTreeSet<_> = set.checksums().into_values().collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn checksums_match_file_bytes() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let samples = make_samples(src.path(), 9, 300);
        let set = ShardWriter::new(out.path(), Split::Train, 700)
            .write(&samples)
            .unwrap();
        assert!(set.shards.len() > 1);
        for s in &set.shards {
            let p = out.path().join(&s.name);
            assert_eq!(file_digest(&p).unwrap(), s.checksum);
            assert_eq!(fs::metadata(&p).unwrap().len(), s.file_bytes);
        }
    }

    #[test]
    fn unreadable_sample_is_skipped() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut samples = make_samples(src.path(), 4, 50);
        samples.insert(
            2,
            Sample {
                path: src.path().join("gone.png"),
                label: 0,
            },
        );
        let set = ShardWriter::new(out.path(), Split::Train, 1 << 20)
            .write(&samples)
            .unwrap();
        assert_eq!(set.skipped, 1);
        assert_eq!(set.records(), 4);
    }

    #[test]
    fn cancelled_writer_leaves_no_partial_files() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let samples = make_samples(src.path(), 3, 10);
        let token = CancelToken::new();
        token.cancel();
        let err = ShardWriter::new(out.path(), Split::Train, 1)
            .with_cancel(token)
            .write(&samples)
            .unwrap_err();
        assert!(matches!(err, ShardError::Cancelled));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    // The middle sample is a FIFO: its reader blocks until the feeder thread
    // opens it, so the token is set while shard 1 is open and holds a record.
    #[cfg(unix)]
    #[test]
    fn cancel_mid_shard_discards_only_the_open_shard() {
        use std::io::Write as _;

        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut samples = make_samples(src.path(), 2, 40);
        let fifo = src.path().join("slow.png");
        let made = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .unwrap();
        assert!(made.success());
        samples.insert(
            1,
            Sample {
                path: fifo.clone(),
                label: 1,
            },
        );

        let token = CancelToken::new();
        let feeder = {
            let token = token.clone();
            std::thread::spawn(move || {
                let mut f = fs::OpenOptions::new().write(true).open(&fifo).unwrap();
                token.cancel();
                f.write_all(b"\x89late").unwrap();
            })
        };

        let err = ShardWriter::new(out.path(), Split::Train, 1)
            .with_cancel(token)
            .write(&samples)
            .unwrap_err();
        feeder.join().unwrap();

        assert!(matches!(err, ShardError::Cancelled));
        let mut left: Vec<_> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, ["train-00000.imgshard"]);
        let names: Vec<_> = ShardReader::open(&out.path().join(&left[0]))
            .unwrap()
            .map(|r| r.unwrap().filename)
            .collect();
        assert_eq!(names, ["img000.png"]);
    }
}
