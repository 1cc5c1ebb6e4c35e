//! Client configuration shared by every upload session.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_STALLED_CHUNKS};

/// Errors from loading or validating a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

/// How the server signals that an upload is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionMode {
    /// The upload is done once the acknowledged offset reaches the size.
    #[default]
    #[serde(rename = "offset")]
    Offset,
    /// The server must return a file identifier on the final chunk.
    /// Running out of bytes without one is an error.
    #[serde(rename = "fileInfo")]
    FileInfo,
}

/// Immutable configuration handed to each uploader at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Bytes sent per chunk request.
    pub chunk_size: usize,
    pub completion: CompletionMode,
    /// Consecutive acknowledgments that leave the offset unchanged before
    /// the upload is declared stalled. `0` disables the check.
    pub max_stalled_chunks: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            completion: CompletionMode::default(),
            max_stalled_chunks: DEFAULT_MAX_STALLED_CHUNKS,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with the given chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Returns a copy with the given completion mode.
    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }
}
