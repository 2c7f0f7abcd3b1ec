use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or reading an index.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("cannot read document {}: {source}", .path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hash table full: no free slot for {key:?} in {size} slots")]
    TableFull { key: String, size: usize },

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptIndex(msg.into())
    }
}
