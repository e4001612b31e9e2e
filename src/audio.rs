// src/audio.rs
use async_trait::async_trait;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// The device or session could not be configured for recording
    #[error("Audio capture could not be started: {0}")]
    Unavailable(String),

    #[error("No active capture handle")]
    NoActiveHandle,
}

/// An open recording target
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    pub id: Uuid,
    pub path: PathBuf,
    pub started_at: Instant,
}

/// What a finished capture produced
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    /// `None` when the recorder never wrote anything
    pub path: Option<PathBuf>,
    pub duration_seconds: f64,
}

#[async_trait]
pub trait AudioCapture: Send + Sync {
    async fn begin(&self) -> Result<CaptureHandle, CaptureError>;
    async fn end(&self, handle: CaptureHandle) -> Result<CapturedAudio, CaptureError>;
}

/// Hands out fresh `.m4a` paths for an external recorder to fill and
/// measures how long each one was open.
pub struct StagedFileCapture {
    directory: PathBuf,
    active: Mutex<Option<Uuid>>,
}

impl StagedFileCapture {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            active: Mutex::new(None),
        }
    }

    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn is_recording(&self) -> bool {
        self.active.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl AudioCapture for StagedFileCapture {
    async fn begin(&self) -> Result<CaptureHandle, CaptureError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CaptureError::Unavailable(format!("{}: {}", self.directory.display(), e)))?;

        let id = Uuid::new_v4();
        let handle = CaptureHandle {
            id,
            path: self.directory.join(format!("{}.m4a", id)),
            started_at: Instant::now(),
        };

        let mut active = self
            .active
            .lock()
            .map_err(|_| CaptureError::Unavailable("capture state poisoned".to_string()))?;
        *active = Some(id);
        info!("Capture {} recording to {}", id, handle.path.display());
        Ok(handle)
    }

    async fn end(&self, handle: CaptureHandle) -> Result<CapturedAudio, CaptureError> {
        {
            let mut active = self.active.lock().map_err(|_| CaptureError::NoActiveHandle)?;
            if *active != Some(handle.id) {
                return Err(CaptureError::NoActiveHandle);
            }
            *active = None;
        }

        let duration_seconds = handle.started_at.elapsed().as_secs_f64();
        let path = match tokio::fs::metadata(&handle.path).await {
            Ok(meta) if meta.is_file() => Some(handle.path),
            _ => {
                warn!("Capture {} produced no audio at {}", handle.id, handle.path.display());
                None
            }
        };

        Ok(CapturedAudio { path, duration_seconds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn end_reports_written_file() {
        let dir = TempDir::new().unwrap();
        let capture = StagedFileCapture::new(dir.path());
        let handle = capture.begin().await.unwrap();
        assert!(capture.is_recording());
        assert_eq!(handle.path.extension().unwrap(), "m4a");

        std::fs::write(&handle.path, b"AAC").unwrap();
        let captured = capture.end(handle.clone()).await.unwrap();

        assert_eq!(captured.path, Some(handle.path));
        assert!(captured.duration_seconds >= 0.0);
        assert!(!capture.is_recording());
    }

    #[tokio::test]
    async fn end_without_output_degrades_to_no_audio() {
        let dir = TempDir::new().unwrap();
        let capture = StagedFileCapture::new(dir.path());
        let handle = capture.begin().await.unwrap();
        let captured = capture.end(handle).await.unwrap();
        assert_eq!(captured.path, None);
    }

    #[tokio::test]
    async fn end_with_stale_handle_fails() {
        let dir = TempDir::new().unwrap();
        let capture = StagedFileCapture::new(dir.path());
        let stale = capture.begin().await.unwrap();
        let _current = capture.begin().await.unwrap();

        assert!(matches!(capture.end(stale.clone()).await, Err(CaptureError::NoActiveHandle)));

        let idle = StagedFileCapture::new(dir.path());
        assert!(matches!(idle.end(stale).await, Err(CaptureError::NoActiveHandle)));
    }
}
