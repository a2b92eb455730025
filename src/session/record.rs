use chrono::Local;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::{AudioCapture, CaptureEvent};
use crate::error::Result;
use crate::repository::{PlacesRepository, RecordingsRepository};
use crate::store::Recording;

/// Lifecycle of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Capturing,
    Finalizing,
    Closed,
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Location metadata captured while recording; fields fill in as the
/// lookup resolves and stay empty if it never does.
#[derive(Debug, Clone, Default)]
struct LocationTag {
    latitude: String,
    longitude: String,
    place: String,
}

struct StartInfo {
    timestamp: i64,
    start_date: String,
    start_time: String,
    file: PathBuf,
    started: Instant,
}

struct Inner {
    state: RecordingState,
    capture: Option<Box<dyn AudioCapture>>,
}

struct SessionCore {
    session_id: Uuid,
    recordings: Arc<RecordingsRepository>,
    state_tx: watch::Sender<RecordingState>,
    start: StartInfo,
    location: Mutex<LocationTag>,
    inner: Mutex<Inner>,
}

impl SessionCore {
    /// The stop path, shared by explicit stop and max-duration auto-stop.
    ///
    /// Idempotent: only the call that observes `Capturing` closes the
    /// capture device and persists; later calls return `Ok(None)`.
    async fn finalize(&self) -> Result<Option<i64>> {
        let capture = {
            let Ok(mut inner) = self.inner.lock() else {
                return Ok(None);
            };
            if inner.state != RecordingState::Capturing {
                return Ok(None);
            }
            inner.state = RecordingState::Finalizing;
            inner.capture.take()
        };
        self.state_tx.send_replace(RecordingState::Finalizing);

        let result = self.close_and_persist(capture).await;

        if let Ok(mut inner) = self.inner.lock() {
            inner.state = RecordingState::Closed;
        }
        self.state_tx.send_replace(RecordingState::Closed);
        result.map(Some)
    }

    async fn close_and_persist(&self, capture: Option<Box<dyn AudioCapture>>) -> Result<i64> {
        if let Some(mut capture) = capture {
            capture.close()?;
        }
        let duration = self.start.started.elapsed();
        // Best-effort metadata: whatever the location task has delivered
        // by now; still-empty fields are persisted as empty strings.
        let tag = self
            .location
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default();
        let recording = Recording {
            id: 0,
            timestamp: self.start.timestamp,
            start_date: self.start.start_date.clone(),
            start_time: self.start.start_time.clone(),
            duration: format_duration(duration),
            file: self.start.file.clone(),
            latitude: tag.latitude,
            longitude: tag.longitude,
            place: tag.place,
        };
        let id = self.recordings.add_recording(recording).await?;
        info!(
            "recording session {} persisted recording {id} ({})",
            self.session_id,
            format_duration(duration)
        );
        Ok(id)
    }
}

/// A recording session: drives the capture device, runs the location
/// lookup in the background and persists the resulting [`Recording`] on
/// stop.
///
/// Dropping the session while it is still capturing abandons it: the
/// capture device is closed, the partial asset is deleted and nothing is
/// persisted.
pub struct RecordingSession {
    core: Arc<SessionCore>,
    driver: JoinHandle<()>,
    location_task: JoinHandle<()>,
}

impl RecordingSession {
    /// Start capturing.
    ///
    /// Records the start instant, derives the asset name from it, opens
    /// the capture device bounded by `max_duration` and kicks off the
    /// best-effort location lookup. A failed open surfaces the error and
    /// leaves no partial state.
    pub async fn start(
        recordings: Arc<RecordingsRepository>,
        places: Arc<PlacesRepository>,
        mut capture: Box<dyn AudioCapture>,
        max_duration: Duration,
    ) -> Result<RecordingSession> {
        let session_id = Uuid::new_v4();
        let now = Local::now();
        let timestamp = now.timestamp();
        let start_date = now.format("%d.%m.").to_string();
        let start_time = now.format("%H:%M").to_string();
        let file = recordings.recording_file(&format!("{timestamp}.{}", capture.extension()));

        let (state_tx, _) = watch::channel(RecordingState::Idle);
        info!(
            "recording session {session_id} starting: {} (max {:?})",
            file.display(),
            max_duration
        );

        let mut events = capture.open(&file, max_duration)?;
        state_tx.send_replace(RecordingState::Capturing);

        let core = Arc::new(SessionCore {
            session_id,
            recordings,
            state_tx,
            start: StartInfo {
                timestamp,
                start_date,
                start_time,
                file,
                started: Instant::now(),
            },
            location: Mutex::new(LocationTag::default()),
            inner: Mutex::new(Inner {
                state: RecordingState::Capturing,
                capture: Some(capture),
            }),
        });

        // Location lookup runs independently of capture; a failure leaves
        // the tag empty and never aborts the session.
        let location_core = Arc::clone(&core);
        let location_task = tokio::spawn(async move {
            match places.current_location().await {
                Ok(fix) => {
                    if let Ok(mut tag) = location_core.location.lock() {
                        tag.latitude = fix.lat.to_string();
                        tag.longitude = fix.lon.to_string();
                    }
                    let place = places.closest_place(fix);
                    if let (Some(place), Ok(mut tag)) = (place, location_core.location.lock()) {
                        tag.place = place.name;
                    }
                }
                Err(e) => debug!("location lookup failed: {e}"),
            }
        });

        // Driver: a max-duration event from the device takes the same
        // stop path as an explicit stop.
        let driver_core = Arc::clone(&core);
        let driver = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    CaptureEvent::MaxDurationReached => {
                        info!(
                            "recording session {} reached max duration",
                            driver_core.session_id
                        );
                        if let Err(e) = driver_core.finalize().await {
                            error!("auto-stop failed: {e}");
                        }
                        break;
                    }
                }
            }
        });

        Ok(RecordingSession {
            core,
            driver,
            location_task,
        })
    }

    /// Stop capturing and persist the recording.
    ///
    /// Returns the id of the persisted recording, or `Ok(None)` when the
    /// session was already stopping or closed (a second stop is a no-op).
    pub async fn stop(&self) -> Result<Option<i64>> {
        self.core.finalize().await
    }

    /// Observable session state.
    pub fn watch_state(&self) -> watch::Receiver<RecordingState> {
        self.core.state_tx.subscribe()
    }

    /// Suspend until the session has closed (explicit stop or auto-stop).
    pub async fn wait_closed(&self) {
        let mut rx = self.core.state_tx.subscribe();
        while *rx.borrow() != RecordingState::Closed {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Formatted start date of this session, e.g. "03.07.".
    pub fn start_date(&self) -> &str {
        &self.core.start.start_date
    }

    /// Formatted start time of this session, e.g. "08:36".
    pub fn start_time(&self) -> &str {
        &self.core.start.start_time
    }

    /// Latitude/longitude/place resolved so far (empty until the lookup
    /// delivers).
    pub fn location(&self) -> (String, String, String) {
        self.core
            .location
            .lock()
            .map(|t| (t.latitude.clone(), t.longitude.clone(), t.place.clone()))
            .unwrap_or_default()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.driver.abort();
        self.location_task.abort();

        let Ok(mut inner) = self.core.inner.lock() else {
            return;
        };
        if inner.state != RecordingState::Capturing {
            return;
        }
        // Abandoned mid-capture: close the device, drop the partial asset.
        inner.state = RecordingState::Closed;
        if let Some(mut capture) = inner.capture.take() {
            if let Err(e) = capture.close() {
                warn!("capture close on abandon failed: {e}");
            }
        }
        if let Err(e) = std::fs::remove_file(&self.core.start.file) {
            warn!(
                "could not remove partial asset {}: {e}",
                self.core.start.file.display()
            );
        }
        self.core.state_tx.send_replace(RecordingState::Closed);
        info!(
            "recording session {} abandoned, partial asset removed",
            self.core.session_id
        );
    }
}
