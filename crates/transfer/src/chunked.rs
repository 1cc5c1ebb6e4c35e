use std::io::ErrorKind;

use sha2::{Digest, Sha256};

use crate::UploadError;
use crate::source::DataSource;

/// A contiguous slice of the upload sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset of `data` within the upload.
    pub offset: i64,
    /// Size of this chunk in bytes.
    pub size: usize,
    pub data: Vec<u8>,
    /// SHA-256 hex checksum of `data`.
    pub checksum: String,
}

impl Chunk {
    /// `Upload-Checksum` header value for this chunk.
    pub fn checksum_header(&self) -> Option<String> {
        tuskit_protocol::constants::checksum_header(&self.checksum)
    }
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Reads up to `chunk_size` bytes of `source` starting at `offset`.
///
/// The read never extends past `source.size()`. A short read (end of
/// stream) is not an error; the chunk carries whatever was read.
pub(crate) fn read_chunk_at<S: DataSource + ?Sized>(
    source: &mut S,
    offset: i64,
    chunk_size: usize,
) -> Result<Chunk, UploadError> {
    source.seek_to(offset).map_err(UploadError::Seek)?;

    let remaining = usize::try_from(source.size().saturating_sub(offset)).unwrap_or(0);
    let mut buf = vec![0u8; chunk_size.min(remaining)];
    let mut filled = 0;
    while filled < buf.len() {
        match source.read_chunk(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(UploadError::Read(e)),
        }
    }
    buf.truncate(filled);

    Ok(Chunk {
        offset,
        size: filled,
        checksum: checksum_bytes(&buf),
        data: buf,
    })
}
