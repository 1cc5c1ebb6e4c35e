//! Resumable chunked uploads.
//!
//! [`Uploader`] drives the upload of a [`DataSource`] to an existing TUS
//! upload resource through a [`Transport`], tracking the offset the server
//! acknowledges so that an interrupted upload can continue from it.

mod chunked;
mod progress;
mod source;
mod store;
mod task;
mod transport;
mod uploader;

pub use chunked::{Chunk, checksum_bytes};
pub use progress::{ProgressCallback, SpeedCalculator};
pub use source::{DataSource, Upload};
pub use store::{ResumeEntry, ResumeStore, StoreError, default_store_path};
pub use task::{UploadTask, spawn_upload};
pub use transport::{ChunkAck, Transport, TransportError};
pub use uploader::{UploadOutcome, Uploader};

pub use tokio_util::sync::CancellationToken;
pub use tuskit_protocol::{ClientConfig, CompletionMode, UploadProgress, UploadStatus};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("seek failed: {0}")]
    Seek(#[source] std::io::Error),

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("all {offset} bytes sent but the server returned no file info")]
    MissingResult { offset: i64 },

    #[error("offset {offset} outside upload of {size} bytes")]
    InvalidOffset { offset: i64, size: i64 },

    #[error("server reported offset {reported} (current {current}, size {size})")]
    OffsetOutOfRange {
        current: i64,
        reported: i64,
        size: i64,
    },

    #[error("upload stalled at offset {offset}")]
    Stalled { offset: i64 },

    #[error("upload aborted")]
    Aborted,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] tuskit_protocol::ConfigError),

    #[error("resume store error: {0}")]
    Store(#[from] StoreError),

    #[error("upload worker failed: {0}")]
    Worker(String),
}
