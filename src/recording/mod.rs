//! Recording sessions: capture audio, then commit one enriched entry

mod coordinator;

pub use coordinator::{RecordingCoordinator, DEFAULT_IP_TIMEOUT};

use thiserror::Error;

use crate::audio::CaptureError;
use crate::storage::StorageError;

/// `Idle → Capturing → Finalizing → Committed`, or `Failed` from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Finalizing,
    Committed,
    Failed,
}

#[derive(Error, Debug)]
pub enum RecordingError {
    /// The audio collaborator could not open or close a capture
    #[error("No active capture: {0}")]
    NoActiveCapture(#[source] CaptureError),

    #[error("No active recorder")]
    NoActiveRecorder,

    #[error(transparent)]
    Storage(#[from] StorageError),
}
