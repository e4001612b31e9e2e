use log::{info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{RecordingError, SessionState};
use crate::audio::{AudioCapture, CaptureError, CaptureHandle};
use crate::location::LocationProvider;
use crate::network::{IpInfo, IpLookup};
use crate::storage::{Entry, TripStorage};

pub const DEFAULT_IP_TIMEOUT: Duration = Duration::from_secs(10);

struct ActiveCapture {
    trip_id: Uuid,
    handle: CaptureHandle,
}

/// Drives one recording session at a time.
///
/// Finalization writes the entry as soon as audio capture ends, then waits
/// (bounded by `ip_timeout`) for the public IP and rewrites the entry with
/// duration, location and IP. The second write always follows the first.
pub struct RecordingCoordinator {
    storage: Arc<TripStorage>,
    audio: Arc<dyn AudioCapture>,
    location: Arc<dyn LocationProvider>,
    ip: Arc<dyn IpLookup>,
    ip_timeout: Duration,
    state: Mutex<SessionState>,
    // Held for the whole of finalization so sessions never overlap.
    active: tokio::sync::Mutex<Option<ActiveCapture>>,
}

impl RecordingCoordinator {
    pub fn new(
        storage: Arc<TripStorage>,
        audio: Arc<dyn AudioCapture>,
        location: Arc<dyn LocationProvider>,
        ip: Arc<dyn IpLookup>,
    ) -> Self {
        Self {
            storage,
            audio,
            location,
            ip,
            ip_timeout: DEFAULT_IP_TIMEOUT,
            state: Mutex::new(SessionState::Idle),
            active: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_ip_timeout(mut self, timeout: Duration) -> Self {
        self.ip_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().map(|s| *s).unwrap_or(SessionState::Failed)
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.lock() {
            if *state != next {
                info!("Recording session {:?} -> {:?}", *state, next);
            }
            *state = next;
        }
    }

    /// Open a capture for `trip_id`. A capture that is still running is
    /// stopped and its audio discarded first.
    pub async fn begin_session(&self, trip_id: &Uuid) -> Result<CaptureHandle, RecordingError> {
        let mut active = self.active.lock().await;

        if let Some(prior) = active.take() {
            warn!("[{}] Force-stopping capture {} for new session", prior.trip_id, prior.handle.id);
            self.discard_capture(prior.handle).await;
            self.set_state(SessionState::Idle);
        }

        self.storage.load_trip(trip_id).await?;

        let handle = match self.audio.begin().await {
            Ok(handle) => handle,
            Err(e) => {
                self.set_state(SessionState::Failed);
                return Err(RecordingError::NoActiveCapture(e));
            }
        };

        info!("[{}] Capturing to {}", trip_id, handle.path.display());
        *active = Some(ActiveCapture {
            trip_id: *trip_id,
            handle: handle.clone(),
        });
        self.set_state(SessionState::Capturing);
        Ok(handle)
    }

    /// Stop the active capture and commit it as an entry with `transcript`.
    pub async fn end_session(&self, transcript: &str) -> Result<Entry, RecordingError> {
        let mut active = self.active.lock().await;
        let capture = active.take().ok_or(RecordingError::NoActiveRecorder)?;
        self.set_state(SessionState::Finalizing);

        match self.finalize(capture, transcript).await {
            Ok(entry) => {
                self.set_state(SessionState::Committed);
                Ok(entry)
            }
            Err(e) => {
                warn!("Recording session failed: {}", e);
                self.set_state(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn finalize(&self, capture: ActiveCapture, transcript: &str) -> Result<Entry, RecordingError> {
        let trip_id = capture.trip_id;

        let staged = capture.handle.path.clone();
        let audio = self.audio.end(capture.handle).await.map_err(|e| {
            warn!(
                "[{}] Stopping capture failed; recording left at {} and transcript not saved",
                trip_id,
                staged.display()
            );
            match e {
                CaptureError::NoActiveHandle => RecordingError::NoActiveRecorder,
                other => RecordingError::NoActiveCapture(other),
            }
        })?;

        // Whatever fix is cached right now; no new fix is requested.
        let location = self.location.snapshot();

        let ip = Arc::clone(&self.ip);
        let mut lookup = tokio::spawn(async move { ip.fetch_public_ip().await });

        let mut entry = match self
            .storage
            .save_entry(&trip_id, transcript, audio.path.as_deref())
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                lookup.abort();
                return Err(e.into());
            }
        };

        entry.audio_duration_seconds = Some(audio.duration_seconds);
        entry.location = location;
        entry.public_ip = self.await_public_ip(&trip_id, &mut lookup).await;

        self.storage.overwrite_entry(&entry).await?;
        info!(
            "[{}] Committed entry {} (ip: {}, location: {})",
            trip_id,
            entry.id,
            entry.public_ip.as_deref().unwrap_or("none"),
            entry.location.is_some()
        );
        Ok(entry)
    }

    async fn await_public_ip(
        &self,
        trip_id: &Uuid,
        lookup: &mut JoinHandle<anyhow::Result<IpInfo>>,
    ) -> Option<String> {
        match tokio::time::timeout(self.ip_timeout, &mut *lookup).await {
            Ok(Ok(Ok(info))) => Some(info.ip),
            Ok(Ok(Err(e))) => {
                warn!("[{}] Public IP lookup failed: {}", trip_id, e);
                None
            }
            Ok(Err(e)) => {
                warn!("[{}] Public IP lookup task failed: {}", trip_id, e);
                None
            }
            Err(_) => {
                lookup.abort();
                warn!("[{}] Public IP lookup timed out after {:?}", trip_id, self.ip_timeout);
                None
            }
        }
    }

    async fn discard_capture(&self, handle: CaptureHandle) {
        match self.audio.end(handle).await {
            Ok(audio) => {
                if let Some(path) = audio.path {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        warn!("Could not remove discarded audio {}: {}", path.display(), e);
                    }
                }
            }
            Err(e) => warn!("Stopping prior capture failed: {}", e),
        }
    }
}
