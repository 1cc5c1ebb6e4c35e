//! Running an upload from async code.
//!
//! The upload loop blocks on I/O, so it runs on tokio's blocking pool
//! while the caller keeps an abort handle.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::UploadError;
use crate::source::DataSource;
use crate::transport::Transport;
use crate::uploader::{UploadOutcome, Uploader};

type TaskOutput<S, T> = (Uploader<S, T>, Result<UploadOutcome, UploadError>);

/// Handle to an upload running on a blocking worker.
pub struct UploadTask<S, T> {
    abort: CancellationToken,
    handle: JoinHandle<TaskOutput<S, T>>,
}

/// Starts `uploader.upload()` on tokio's blocking pool.
///
/// Must be called from within a tokio runtime.
pub fn spawn_upload<S, T>(mut uploader: Uploader<S, T>) -> UploadTask<S, T>
where
    S: DataSource + Send + 'static,
    T: Transport + 'static,
{
    let abort = uploader.abort_handle();
    let handle = tokio::task::spawn_blocking(move || {
        let result = uploader.upload();
        (uploader, result)
    });
    UploadTask { abort, handle }
}

impl<S, T> UploadTask<S, T> {
    /// Stops the upload before its next chunk.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn abort_handle(&self) -> CancellationToken {
        self.abort.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the upload to end.
    ///
    /// The uploader is handed back alongside the result so its offset can
    /// be inspected or the upload retried.
    pub async fn join(self) -> Result<TaskOutput<S, T>, UploadError> {
        self.handle
            .await
            .map_err(|e| UploadError::Worker(e.to_string()))
    }
}
