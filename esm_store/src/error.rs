use esm_stream::{RecordTag, StreamError};
use thiserror::Error;

/// Errors raised by store lookups and by applying a content file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} record '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Structural problems with a content file; fatal to that file's load.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unreadable record stream: {0}")]
    Stream(#[from] StreamError),
    #[error("cannot decode {tag} record #{position}: {source}")]
    Decode {
        tag: RecordTag,
        position: usize,
        #[source]
        source: StreamError,
    },
    #[error("INFO record '{info}' (#{position}) is not preceded by a DIAL record")]
    OrphanInfo { info: String, position: usize },
    #[error("record kind {tag} (#{position}) is marked required but is not supported")]
    UnsupportedRequired { tag: RecordTag, position: usize },
}

/// A content file failed to load; carries the file's position in the load order.
#[derive(Debug, Error)]
#[error("failed to load {file} (content file #{index}): {source}")]
pub struct LoadError {
    pub index: usize,
    pub file: String,
    #[source]
    pub source: StoreError,
}
