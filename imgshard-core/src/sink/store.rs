use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ShardError};

/// Upload side channel: "put this local file under this key".
pub trait BlobStore: Send + Sync {
    fn upload(&self, local: &Path, key: &str) -> Result<()>;
}

/// Mirrors uploads into a directory tree rooted at `root`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn target(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ShardError::Upload {
                key: key.to_string(),
                message: "unsafe key".into(),
            });
        }
        Ok(self.root.join(rel))
    }
}

impl BlobStore for FsBlobStore {
    fn upload(&self, local: &Path, key: &str) -> Result<()> {
        let dst = self.target(key)?;
        let fail = |e: std::io::Error| ShardError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        fs::copy(local, &dst).map_err(fail)?;
        tracing::debug!(key, "uploaded");
        Ok(())
    }
}

pub enum Backend {
    Fs(PathBuf),
}

pub fn open_store(backend: Backend) -> Box<dyn BlobStore> {
    match backend {
        Backend::Fs(root) => Box::new(FsBlobStore::new(root)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_under_key() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.bin");
        fs::write(&src, b"payload").unwrap();
        let store = open_store(Backend::Fs(tmp.path().join("bucket")));
        store.upload(&src, "projects/p/shards/a.bin").unwrap();
        let got = fs::read(tmp.path().join("bucket/projects/p/shards/a.bin")).unwrap();
        assert_eq!(got, b"payload");
    }

    #[test]
    fn rejects_escaping_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.bin");
        fs::write(&src, b"x").unwrap();
        let store = FsBlobStore::new(tmp.path().join("bucket"));
        let err = store.upload(&src, "../outside.bin").unwrap_err();
        assert!(err.is_upload());
    }

    #[test]
    fn missing_source_is_an_upload_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path());
        let err = store.upload(&tmp.path().join("nope"), "k/nope").unwrap_err();
        assert!(err.is_upload());
    }
}
