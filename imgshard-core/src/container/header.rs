use std::io::{Read, Write};

pub const MAGIC: &[u8; 6] = b"IMGSHD";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: u64 = 8;
/// File extension of shard files.
pub const SHARD_EXT: &str = "imgshard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHeader {
    pub version: u16,
}

impl Default for ShardHeader {
    fn default() -> Self {
        Self { version: VERSION }
    }
}

impl ShardHeader {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut magic = [0u8; 6];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "not a shard file (bad magic)",
            ));
        }
        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);
        if version != VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unsupported shard version {version}"),
            ));
        }
        Ok(Self { version })
    }
}

/// `train-00003.imgshard`
pub fn shard_file_name(split: &str, index: usize) -> String {
    format!("{split}-{index:05}.{SHARD_EXT}")
}

/// Inverse of [`shard_file_name`]: `train-00003.imgshard` -> `("train", 3)`.
pub fn parse_shard_file_name(name: &str) -> Option<(&str, usize)> {
    let stem = name.strip_suffix(SHARD_EXT)?.strip_suffix('.')?;
    let (split, index) = stem.rsplit_once('-')?;
    if split.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((split, index.parse().ok()?))
}
