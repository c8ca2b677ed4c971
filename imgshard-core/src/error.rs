use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("no recognizable class structure under {} (searched {max_depth} levels)", root.display())]
    StructureNotFound { root: PathBuf, max_depth: usize },

    #[error("failed to read sample {}: {source}", path.display())]
    SampleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("status sink error: {0}")]
    Sink(String),

    #[error("conversion cancelled")]
    Cancelled,
}

impl ShardError {
    /// True for failures that happened after the shards were produced locally.
    pub fn is_upload(&self) -> bool {
        matches!(self, ShardError::Upload { .. })
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, ShardError>;
