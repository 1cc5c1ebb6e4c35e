//! `Upload-Metadata` header encoding.
//!
//! The header is a comma-separated list of `key base64(value)` pairs. A key
//! with an empty value is sent on its own.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD};

/// Errors from decoding an `Upload-Metadata` header.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("invalid metadata key: {0:?}")]
    InvalidKey(String),

    #[error("invalid base64 value for key {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("metadata value for key {0} is not UTF-8")]
    NotUtf8(String),
}

/// Encodes metadata pairs into an `Upload-Metadata` header value.
///
/// Keys are emitted in sorted order. Keys that would break the header
/// framing (empty, or containing spaces or commas) are skipped.
pub fn encode_metadata(metadata: &BTreeMap<String, String>) -> String {
    metadata
        .iter()
        .filter(|(key, _)| is_valid_key(key))
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{key} {}", STANDARD.encode(value.as_bytes()))
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes an `Upload-Metadata` header value.
pub fn decode_metadata(header: &str) -> Result<BTreeMap<String, String>, MetadataError> {
    let mut out = BTreeMap::new();
    for pair in header.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let mut parts = pair.splitn(2, ' ');
        let key = parts.next().unwrap_or_default();
        if !is_valid_key(key) {
            return Err(MetadataError::InvalidKey(key.to_string()));
        }

        let value = match parts.next().map(str::trim) {
            None | Some("") => String::new(),
            Some(encoded) => {
                let raw = STANDARD
                    .decode(encoded)
                    .map_err(|source| MetadataError::InvalidValue {
                        key: key.to_string(),
                        source,
                    })?;
                String::from_utf8(raw).map_err(|_| MetadataError::NotUtf8(key.to_string()))?
            }
        };
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains([' ', ','])
}
