//! Offset-driven chunk upload loop.
//!
//! An [`Uploader`] is bound to an upload resource that already exists on
//! the server. It reads the source from the acknowledged offset, sends one
//! chunk at a time and trusts the offset the server reports back.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tuskit_protocol::{ClientConfig, CompletionMode, UploadProgress, UploadStatus};

use crate::UploadError;
use crate::chunked::read_chunk_at;
use crate::progress::{ProgressCallback, SpeedCalculator};
use crate::source::DataSource;
use crate::store::{ResumeEntry, ResumeStore};
use crate::transport::{ChunkAck, Transport};

/// How an [`Uploader::upload`] run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server returned the final file identifier.
    Completed { file_info: String },
    /// Every byte was acknowledged and no identifier was required.
    Finished { offset: i64 },
    /// The upload was aborted; `offset` is the last acknowledged offset.
    Aborted { offset: i64 },
}

impl UploadOutcome {
    /// Returns the server file identifier, if the upload produced one.
    pub fn file_info(&self) -> Option<&str> {
        match self {
            Self::Completed { file_info } => Some(file_info.as_str()),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Uploads a [`DataSource`] to an existing upload resource in chunks.
pub struct Uploader<S, T> {
    transport: T,
    url: String,
    source: S,
    config: ClientConfig,
    offset: i64,
    abort: CancellationToken,
    file_info: Option<String>,
    status: UploadStatus,
    error: String,
    speed: SpeedCalculator,
    callbacks: Vec<ProgressCallback>,
    resume: Option<(Arc<ResumeStore>, String)>,
}

impl<S: DataSource, T: Transport> Uploader<S, T> {
    /// Creates an uploader for the resource at `url`, starting at `offset`
    /// (0 for a fresh upload, the server offset when resuming).
    pub fn new(
        transport: T,
        url: impl Into<String>,
        source: S,
        config: ClientConfig,
        offset: i64,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let size = source.size();
        if offset < 0 || offset > size {
            return Err(UploadError::InvalidOffset { offset, size });
        }

        Ok(Self {
            transport,
            url: url.into(),
            source,
            config,
            offset,
            abort: CancellationToken::new(),
            file_info: None,
            status: UploadStatus::Pending,
            error: String::new(),
            speed: SpeedCalculator::default(),
            callbacks: Vec::new(),
            resume: None,
        })
    }

    /// Rebuilds an uploader from the entry stored under `fingerprint`.
    ///
    /// Returns `Ok(None)` when nothing is stored. The returned uploader
    /// keeps updating the entry as chunks are acknowledged.
    pub fn resume(
        transport: T,
        store: Arc<ResumeStore>,
        fingerprint: &str,
        source: S,
        config: ClientConfig,
    ) -> Result<Option<Self>, UploadError> {
        let Some(entry) = store.get(fingerprint) else {
            return Ok(None);
        };
        debug!(url = %entry.url, offset = entry.offset, "resuming upload");
        let uploader = Self::new(transport, entry.url, source, config, entry.offset)?;
        Ok(Some(uploader.with_store(store, fingerprint)?))
    }

    /// Persists the upload position under `fingerprint` after every
    /// acknowledged chunk; the entry is removed once the upload finishes.
    pub fn with_store(
        mut self,
        store: Arc<ResumeStore>,
        fingerprint: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let fingerprint = fingerprint.into();
        store.save(&fingerprint, ResumeEntry::new(&self.url, self.offset))?;
        self.resume = Some((store, fingerprint));
        Ok(self)
    }

    /// Registers a callback invoked after every acknowledged chunk and on
    /// each terminal transition.
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        self.callbacks.push(callback);
    }

    /// Stops the upload before the next chunk.
    ///
    /// A chunk already being sent is not interrupted.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    /// Returns a handle that aborts this upload from another thread or task.
    ///
    /// Transports able to interrupt an in-flight request may observe the
    /// same token.
    pub fn abort_handle(&self) -> CancellationToken {
        self.abort.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Upload resource URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Bytes acknowledged by the server.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Total bytes to upload.
    pub fn size(&self) -> i64 {
        self.source.size()
    }

    /// Final file identifier, once the server has returned one.
    pub fn file_info(&self) -> Option<&str> {
        self.file_info.as_deref()
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Estimated time to finish at the recent transfer speed.
    pub fn eta(&self) -> Option<Duration> {
        self.speed.eta(self.size() - self.offset)
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            url: self.url.clone(),
            status: self.status,
            total_bytes: self.size(),
            offset: self.offset,
            bytes_per_second: self.speed.bytes_per_second(),
            error: self.error.clone(),
        }
    }

    /// Consumes the uploader, returning the data source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Sends exactly one chunk starting at the current offset.
    ///
    /// On [`ChunkAck::Advanced`] the offset moves to the server-reported
    /// value. On [`ChunkAck::Completed`] the identifier is recorded and the
    /// offset is left alone. Errors leave the offset unchanged.
    pub fn upload_chunk(&mut self) -> Result<ChunkAck, UploadError> {
        if let Some(file_info) = &self.file_info {
            return Ok(ChunkAck::Completed(file_info.clone()));
        }
        if self.is_aborted() {
            self.status = UploadStatus::Cancelled;
            self.notify();
            return Err(UploadError::Aborted);
        }
        self.send_next_chunk()
    }

    /// Reads and sends the chunk at the current offset. The abort flag is
    /// checked by callers, once per iteration.
    fn send_next_chunk(&mut self) -> Result<ChunkAck, UploadError> {
        self.status = UploadStatus::InProgress;

        let chunk = match read_chunk_at(&mut self.source, self.offset, self.config.chunk_size) {
            Ok(chunk) => chunk,
            Err(e) => return Err(self.fail(e)),
        };

        debug!(url = %self.url, offset = chunk.offset, size = chunk.size, "sending chunk");

        match self.transport.send_chunk(&self.url, &chunk) {
            Ok(ChunkAck::Completed(file_info)) => {
                info!(url = %self.url, file_info = %file_info, "server returned file info");
                self.file_info = Some(file_info.clone());
                self.status = UploadStatus::Completed;
                self.forget_resume();
                self.notify();
                Ok(ChunkAck::Completed(file_info))
            }
            Ok(ChunkAck::Advanced(reported)) => {
                let size = self.size();
                if reported < self.offset || reported > size {
                    return Err(self.fail(UploadError::OffsetOutOfRange {
                        current: self.offset,
                        reported,
                        size,
                    }));
                }
                if reported != chunk.offset + chunk.size as i64 {
                    debug!(
                        url = %self.url,
                        sent = chunk.size,
                        reported,
                        "server acknowledged a different offset than sent"
                    );
                }
                self.speed.add_sample(reported - self.offset);
                self.offset = reported;
                self.persist_resume();
                self.notify();
                Ok(ChunkAck::Advanced(reported))
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Sends chunks until the upload completes, is aborted or fails.
    ///
    /// A file identifier returned by the server ends the upload at once,
    /// even if bytes remain. When all bytes are acknowledged without one,
    /// the result depends on [`ClientConfig::completion`].
    pub fn upload(&mut self) -> Result<UploadOutcome, UploadError> {
        if let Some(file_info) = &self.file_info {
            return Ok(UploadOutcome::Completed {
                file_info: file_info.clone(),
            });
        }

        if self.status == UploadStatus::Failed {
            self.speed.reset();
        }

        let mut stalled = 0u32;
        while self.offset < self.size() && !self.is_aborted() {
            let before = self.offset;
            if let ChunkAck::Completed(file_info) = self.send_next_chunk()? {
                return Ok(UploadOutcome::Completed { file_info });
            }

            if self.offset > before {
                stalled = 0;
                continue;
            }
            stalled += 1;
            let limit = self.config.max_stalled_chunks;
            if limit > 0 && stalled >= limit {
                return Err(self.fail(UploadError::Stalled {
                    offset: self.offset,
                }));
            }
        }

        if self.is_aborted() {
            info!(url = %self.url, offset = self.offset, "upload aborted");
            self.status = UploadStatus::Cancelled;
            self.notify();
            return Ok(UploadOutcome::Aborted {
                offset: self.offset,
            });
        }

        match self.config.completion {
            CompletionMode::Offset => {
                info!(url = %self.url, size = self.offset, "upload finished");
                self.status = UploadStatus::Completed;
                self.forget_resume();
                self.notify();
                Ok(UploadOutcome::Finished {
                    offset: self.offset,
                })
            }
            CompletionMode::FileInfo => Err(self.fail(UploadError::MissingResult {
                offset: self.offset,
            })),
        }
    }

    fn fail(&mut self, err: UploadError) -> UploadError {
        warn!(url = %self.url, offset = self.offset, error = %err, "upload failed");
        self.status = UploadStatus::Failed;
        self.error = err.to_string();
        self.notify();
        err
    }

    fn notify(&self) {
        if self.callbacks.is_empty() {
            return;
        }
        let progress = self.progress();
        for cb in &self.callbacks {
            cb(progress.clone());
        }
    }

    fn persist_resume(&self) {
        if let Some((store, fingerprint)) = &self.resume
            && let Err(e) = store.save(fingerprint, ResumeEntry::new(&self.url, self.offset))
        {
            warn!(fingerprint = %fingerprint, error = %e, "failed to persist resume offset");
        }
    }

    fn forget_resume(&self) {
        if let Some((store, fingerprint)) = &self.resume
            && let Err(e) = store.remove(fingerprint)
        {
            warn!(fingerprint = %fingerprint, error = %e, "failed to remove resume entry");
        }
    }
}
