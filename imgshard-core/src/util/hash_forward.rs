use std::io::{Result, Write};

/// Forwards writes to `inner` while hashing and counting every byte.
pub struct HashingForward<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
    pub written: u64,
}

impl<W: Write> HashingForward<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            written: 0,
        }
    }

    /// Hand back the writer together with the digest of everything written.
    pub fn finish(self) -> (W, blake3::Hash) {
        let digest = self.hasher.finalize();
        (self.inner, digest)
    }
}

impl<W: Write> Write for HashingForward<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

/// Hex BLAKE3 digest of a whole file.
pub fn file_digest(path: &std::path::Path) -> Result<String> {
    let mut f = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut f, &mut hasher)?;
    Ok(hex::encode(hasher.finalize().as_bytes()))
}
