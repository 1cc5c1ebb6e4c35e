//! Wire vocabulary for the tuskit resumable upload client.
//!
//! Transport implementations build their requests from the constants and
//! metadata helpers here; the transfer engine shares [`ClientConfig`],
//! [`UploadStatus`] and [`UploadProgress`] with its callers.

pub mod config;
pub mod constants;
pub mod metadata;
pub mod types;

// Re-export primary types for convenience.
pub use config::{ClientConfig, CompletionMode, ConfigError};
pub use metadata::{MetadataError, decode_metadata, encode_metadata};
pub use types::{UploadProgress, UploadStatus};
