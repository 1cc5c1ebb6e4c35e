//! Protocol constants for TUS 1.0.0.

use base64::{Engine, engine::general_purpose::STANDARD};

/// Protocol version sent in every request.
pub const TUS_VERSION: &str = "1.0.0";

/// Header carrying the protocol version.
pub const HEADER_TUS_RESUMABLE: &str = "Tus-Resumable";

/// Header carrying the byte offset of a chunk (request) or the
/// acknowledged offset (response).
pub const HEADER_UPLOAD_OFFSET: &str = "Upload-Offset";

/// Header carrying the total upload size.
pub const HEADER_UPLOAD_LENGTH: &str = "Upload-Length";

/// Header carrying encoded upload metadata.
pub const HEADER_UPLOAD_METADATA: &str = "Upload-Metadata";

/// Header carrying the checksum of a chunk body.
pub const HEADER_UPLOAD_CHECKSUM: &str = "Upload-Checksum";

/// Content type required on chunk (PATCH) requests.
pub const CONTENT_TYPE_OFFSET_STREAM: &str = "application/offset+octet-stream";

/// Default chunk size: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Default number of consecutive non-advancing acknowledgments tolerated.
pub const DEFAULT_MAX_STALLED_CHUNKS: u32 = 3;

/// Builds an `Upload-Checksum` value from a hex-encoded SHA-256 digest.
///
/// The header carries `<algorithm> <base64 digest>`. Returns `None` if
/// `hex_digest` is not valid hex.
pub fn checksum_header(hex_digest: &str) -> Option<String> {
    let digest = hex::decode(hex_digest).ok()?;
    Some(format!("sha256 {}", STANDARD.encode(digest)))
}
