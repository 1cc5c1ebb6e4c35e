//! Seekable, sized byte sources for uploads.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tuskit_protocol::encode_metadata;

use crate::UploadError;

/// Random-access byte stream with a size fixed for the life of an upload.
pub trait DataSource {
    /// Positions the stream at the absolute byte `offset`.
    fn seek_to(&mut self, offset: i64) -> io::Result<()>;

    /// Reads into `buf`, returning the number of bytes read (0 at end of stream).
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Total size in bytes.
    fn size(&self) -> i64;
}

impl<D: DataSource + ?Sized> DataSource for &mut D {
    fn seek_to(&mut self, offset: i64) -> io::Result<()> {
        (**self).seek_to(offset)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }

    fn size(&self) -> i64 {
        (**self).size()
    }
}

impl<D: DataSource + ?Sized> DataSource for Box<D> {
    fn seek_to(&mut self, offset: i64) -> io::Result<()> {
        (**self).seek_to(offset)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }

    fn size(&self) -> i64 {
        (**self).size()
    }
}

/// A local upload: a seekable reader, its size, metadata and fingerprint.
pub struct Upload<R> {
    reader: R,
    size: i64,
    metadata: BTreeMap<String, String>,
    fingerprint: String,
}

impl<R: Read + Seek> Upload<R> {
    /// Wraps `reader` as an upload of `size` bytes.
    pub fn new(reader: R, size: i64) -> Self {
        Self {
            reader,
            size,
            metadata: BTreeMap::new(),
            fingerprint: String::new(),
        }
    }

    /// Sets a metadata pair sent with the upload creation request.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Overrides the resume-store key.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Metadata formatted for the `Upload-Metadata` header.
    pub fn encoded_metadata(&self) -> String {
        encode_metadata(&self.metadata)
    }

    /// Key identifying this source in a [`ResumeStore`](crate::ResumeStore).
    /// Empty when the source has no stable identity.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Consumes the upload, returning the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl Upload<File> {
    /// Opens `path` for upload.
    ///
    /// The `filename` metadata is set from the file name. The fingerprint
    /// hashes the canonical path, size and modification time, so it changes
    /// whenever the file does.
    pub fn from_file(path: &Path) -> Result<Self, UploadError> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        let size = meta.len() as i64;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let canonical = path.canonicalize()?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        hasher.update(size.to_le_bytes());
        hasher.update(modified.to_le_bytes());
        let fingerprint = hex::encode(hasher.finalize());

        let mut upload = Self::new(file, size).with_fingerprint(fingerprint);
        if let Some(name) = path.file_name() {
            upload = upload.with_metadata("filename", name.to_string_lossy());
        }
        Ok(upload)
    }
}

impl Upload<Cursor<Vec<u8>>> {
    /// Creates an upload from an in-memory buffer, fingerprinted by content.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let fingerprint = crate::checksum_bytes(&data);
        let size = data.len() as i64;
        Self::new(Cursor::new(data), size).with_fingerprint(fingerprint)
    }
}

impl<R: Read + Seek> DataSource for Upload<R> {
    fn seek_to(&mut self, offset: i64) -> io::Result<()> {
        let pos = u64::try_from(offset).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("negative offset {offset}"))
        })?;
        self.reader.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn size(&self) -> i64 {
        self.size
    }
}
