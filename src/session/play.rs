use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audio::{AudioRenderer, RenderEvent};
use crate::error::Result;
use crate::repository::RecordingsRepository;
use crate::store::Recording;

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Loading,
    Playing,
    Paused,
    Stopped,
}

/// Snapshot of the playback position, republished at ~30 Hz while playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub position_ms: u64,
    pub duration_ms: u64,
    /// Formatted `position / duration`, e.g. "00:12 / 02:34".
    pub display: String,
}

fn format_playback_time(position_ms: u64, duration_ms: u64) -> String {
    let position_secs = position_ms / 1000;
    let duration_secs = duration_ms / 1000;
    format!(
        "{:02}:{:02} / {:02}:{:02}",
        position_secs / 60,
        position_secs % 60,
        duration_secs / 60,
        duration_secs % 60
    )
}

impl PlaybackPosition {
    fn at(position_ms: u64, duration_ms: u64) -> Self {
        Self {
            position_ms,
            duration_ms,
            display: format_playback_time(position_ms, duration_ms),
        }
    }
}

struct PlayInner {
    renderer: Option<Box<dyn AudioRenderer>>,
    duration_ms: u64,
    /// While true a drag is in progress and the sampling loop must not
    /// overwrite the user-set position.
    seeking: bool,
    seek_position_ms: u64,
}

struct PlayCore {
    session_id: Uuid,
    state_tx: watch::Sender<PlaybackState>,
    position_tx: watch::Sender<PlaybackPosition>,
    inner: Mutex<PlayInner>,
}

impl PlayCore {
    /// Release the renderer and enter `Stopped`. Every exit path ends
    /// here: explicit stop, end-of-asset, teardown.
    fn finalize(&self) {
        let released = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            match inner.renderer.take() {
                Some(mut renderer) => {
                    renderer.stop();
                    true
                }
                None => false,
            }
        };
        if released {
            info!("playback session {} stopped", self.session_id);
        }
        self.state_tx.send_replace(PlaybackState::Stopped);
    }

    /// One tick of the sampling loop: republish the renderer position
    /// unless a drag holds authority.
    fn sample_position(&self) {
        let Ok(inner) = self.inner.lock() else {
            return;
        };
        if inner.seeking {
            return;
        }
        if *self.state_tx.borrow() != PlaybackState::Playing {
            return;
        }
        let Some(renderer) = inner.renderer.as_ref() else {
            return;
        };
        let Some(position_ms) = renderer.position_ms() else {
            return;
        };
        let duration_ms = inner.duration_ms;
        drop(inner);
        self.position_tx
            .send_replace(PlaybackPosition::at(position_ms, duration_ms));
    }
}

/// A playback session for one stored recording: transport controls plus a
/// periodic position-sampling loop.
///
/// Dropping the session releases the renderer.
pub struct PlaybackSession {
    core: Arc<PlayCore>,
    recording: Option<Recording>,
    driver: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Load the recording and begin playback.
    ///
    /// When no recording has the given id the session is born stopped:
    /// completion is signalled immediately and no renderer is opened.
    pub async fn start(
        recordings: &RecordingsRepository,
        mut renderer: Box<dyn AudioRenderer>,
        recording_id: i64,
    ) -> Result<PlaybackSession> {
        let session_id = Uuid::new_v4();
        let (state_tx, _) = watch::channel(PlaybackState::Loading);
        let (position_tx, _) = watch::channel(PlaybackPosition::at(0, 0));

        let Some(recording) = recordings.recording(recording_id).await? else {
            info!("playback session {session_id}: no recording with id {recording_id}");
            state_tx.send_replace(PlaybackState::Stopped);
            let core = Arc::new(PlayCore {
                session_id,
                state_tx,
                position_tx,
                inner: Mutex::new(PlayInner {
                    renderer: None,
                    duration_ms: 0,
                    seeking: false,
                    seek_position_ms: 0,
                }),
            });
            return Ok(PlaybackSession {
                core,
                recording: None,
                driver: None,
            });
        };

        let mut events = renderer.open(&recording.file)?;
        let duration_ms = renderer.duration_ms().unwrap_or(0);
        renderer.play();
        info!(
            "playback session {session_id} playing recording {} ({duration_ms} ms)",
            recording.id
        );
        state_tx.send_replace(PlaybackState::Playing);
        position_tx.send_replace(PlaybackPosition::at(0, duration_ms));

        let core = Arc::new(PlayCore {
            session_id,
            state_tx,
            position_tx,
            inner: Mutex::new(PlayInner {
                renderer: Some(renderer),
                duration_ms,
                seeking: false,
                seek_position_ms: 0,
            }),
        });

        // Sampling loop: ~30 Hz position republish while playing, plus the
        // renderer's end-of-asset event.
        let driver_core = Arc::clone(&core);
        let driver = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(33));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *driver_core.state_tx.borrow() == PlaybackState::Stopped {
                            break;
                        }
                        driver_core.sample_position();
                    }
                    event = events.recv() => match event {
                        Some(RenderEvent::Completed) => {
                            info!(
                                "playback session {} reached end of asset",
                                driver_core.session_id
                            );
                            driver_core.finalize();
                            break;
                        }
                        // Channel gone means the renderer is released.
                        None => break,
                    }
                }
            }
        });

        Ok(PlaybackSession {
            core,
            recording: Some(recording),
            driver: Some(driver),
        })
    }

    /// Pause playback, keeping the renderer and position.
    pub fn pause(&self) {
        let Ok(mut inner) = self.core.inner.lock() else {
            return;
        };
        if let Some(renderer) = inner.renderer.as_mut() {
            renderer.pause();
            self.core.state_tx.send_replace(PlaybackState::Paused);
        }
    }

    /// Resume a paused playback.
    pub fn resume(&self) {
        let Ok(mut inner) = self.core.inner.lock() else {
            return;
        };
        if let Some(renderer) = inner.renderer.as_mut() {
            renderer.play();
            self.core.state_tx.send_replace(PlaybackState::Playing);
        }
    }

    /// Report a position while the user drags the position control.
    ///
    /// The value becomes authoritative for the published position until
    /// [`seek_commit`](Self::seek_commit) is called; the sampling loop
    /// will not overwrite it.
    pub fn seek_preview(&self, position_ms: u64) {
        let Ok(mut inner) = self.core.inner.lock() else {
            return;
        };
        inner.seeking = true;
        inner.seek_position_ms = position_ms;
        let duration_ms = inner.duration_ms;
        drop(inner);
        self.core
            .position_tx
            .send_replace(PlaybackPosition::at(position_ms, duration_ms));
    }

    /// Commit the dragged position: instruct the renderer to seek and
    /// return authority to the sampling loop.
    pub fn seek_commit(&self) {
        let Ok(mut inner) = self.core.inner.lock() else {
            return;
        };
        if !inner.seeking {
            return;
        }
        inner.seeking = false;
        let position = inner.seek_position_ms;
        if let Some(renderer) = inner.renderer.as_mut() {
            renderer.seek(position);
        }
    }

    /// Stop playback and release the renderer.
    pub fn stop(&self) {
        self.core.finalize();
    }

    /// Observable session state.
    pub fn watch_state(&self) -> watch::Receiver<PlaybackState> {
        self.core.state_tx.subscribe()
    }

    /// Observable playback position.
    pub fn watch_position(&self) -> watch::Receiver<PlaybackPosition> {
        self.core.position_tx.subscribe()
    }

    /// Suspend until the session has stopped (explicit stop, completion
    /// or missing recording).
    pub async fn wait_stopped(&self) {
        let mut rx = self.core.state_tx.subscribe();
        while *rx.borrow() != PlaybackState::Stopped {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// The recording being played, if it was found.
    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// Asset duration in milliseconds (0 when no recording was found).
    pub fn duration_ms(&self) -> u64 {
        self.core
            .inner
            .lock()
            .map(|inner| inner.duration_ms)
            .unwrap_or(0)
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        if *self.core.state_tx.borrow() != PlaybackState::Stopped {
            warn!(
                "playback session {} dropped while active, releasing renderer",
                self.core.session_id
            );
        }
        self.core.finalize();
    }
}
