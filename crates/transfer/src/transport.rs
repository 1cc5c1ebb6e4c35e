//! Boundary to the network client that performs chunk requests.
//!
//! The transfer engine never talks HTTP itself. An application implements
//! [`Transport`] on top of its HTTP client, typically as a `PATCH` to the
//! upload URL carrying `Upload-Offset` and the chunk body.

use std::sync::Arc;

use crate::chunked::Chunk;

/// Server acknowledgment of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkAck {
    /// The server accepted data up to this absolute offset.
    Advanced(i64),
    /// The server considers the upload finished and returned the final
    /// file identifier, regardless of the byte offset.
    Completed(String),
}

/// Errors reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server responded {code}: {message}")]
    Status { code: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Sends a single chunk to the upload resource at `url`.
///
/// Implementations block until the server answers. Timeouts and retries
/// belong to the implementation; the uploader propagates every error as is.
pub trait Transport: Send + Sync {
    fn send_chunk(&self, url: &str, chunk: &Chunk) -> Result<ChunkAck, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_chunk(&self, url: &str, chunk: &Chunk) -> Result<ChunkAck, TransportError> {
        (**self).send_chunk(url, chunk)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_chunk(&self, url: &str, chunk: &Chunk) -> Result<ChunkAck, TransportError> {
        (**self).send_chunk(url, chunk)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_chunk(&self, url: &str, chunk: &Chunk) -> Result<ChunkAck, TransportError> {
        (**self).send_chunk(url, chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Transport for Echo {
        fn send_chunk(&self, _url: &str, chunk: &Chunk) -> Result<ChunkAck, TransportError> {
            Ok(ChunkAck::Advanced(chunk.offset + chunk.size as i64))
        }
    }

    fn chunk(offset: i64, data: &[u8]) -> Chunk {
        Chunk {
            offset,
            size: data.len(),
            data: data.to_vec(),
            checksum: String::new(),
        }
    }

    #[test]
    fn wrappers_delegate() {
        let c = chunk(10, b"abcd");
        assert_eq!(Echo.send_chunk("u", &c).unwrap(), ChunkAck::Advanced(14));
        assert_eq!((&Echo).send_chunk("u", &c).unwrap(), ChunkAck::Advanced(14));

        let boxed: Box<dyn Transport> = Box::new(Echo);
        assert_eq!(boxed.send_chunk("u", &c).unwrap(), ChunkAck::Advanced(14));

        let shared: Arc<dyn Transport> = Arc::new(Echo);
        assert_eq!(shared.send_chunk("u", &c).unwrap(), ChunkAck::Advanced(14));
    }

    #[test]
    fn error_display() {
        let err = TransportError::Status {
            code: 409,
            message: "offset mismatch".into(),
        };
        assert_eq!(err.to_string(), "server responded 409: offset mismatch");

        let boxed: Box<dyn std::error::Error + Send + Sync> = "socket reset".into();
        assert_eq!(TransportError::from(boxed).to_string(), "socket reset");
    }
}
