use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;

/// Event emitted by a renderer while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// Playback reached the end of the asset.
    Completed,
}

/// Audio playback capability.
///
/// Transport calls are synchronous and may block briefly. `stop` releases
/// the underlying resource; afterwards `position_ms`/`duration_ms` return
/// `None` and the transport calls are no-ops. That is the observable
/// "released" state.
pub trait AudioRenderer: Send {
    /// Open the given asset, paused at position 0.
    fn open(&mut self, path: &Path) -> Result<mpsc::Receiver<RenderEvent>>;

    /// Start or resume playback.
    fn play(&mut self);

    /// Pause playback, keeping the position.
    fn pause(&mut self);

    /// Stop playback and release the resource. Idempotent.
    fn stop(&mut self);

    /// Jump to the given position (milliseconds from the start).
    fn seek(&mut self, position_ms: u64);

    /// Current position in milliseconds, `None` once released.
    fn position_ms(&self) -> Option<u64>;

    /// Asset duration in milliseconds, `None` once released.
    fn duration_ms(&self) -> Option<u64>;

    /// Whether the renderer currently holds an asset.
    fn is_open(&self) -> bool;

    /// Renderer name for logging.
    fn name(&self) -> &str;
}

/// Renderer that derives the asset duration from the WAV header and
/// advances the position on a monotonic clock.
///
/// There is no audio output device on the core's test/demo surface; what
/// the sessions depend on is transport state, position progress and the
/// completion event, which this implementation provides with real timing.
pub struct WavClockRenderer {
    state: Option<Arc<Mutex<ClockState>>>,
    monitor: Option<thread::JoinHandle<()>>,
}

struct ClockState {
    duration_ms: u64,
    /// Position accumulated up to the last play/pause/seek.
    base_ms: u64,
    playing_since: Option<Instant>,
    released: bool,
    completed: bool,
}

impl ClockState {
    fn position_ms(&self) -> u64 {
        let running = self
            .playing_since
            .map(|since| since.elapsed().as_millis() as u64)
            .unwrap_or(0);
        (self.base_ms + running).min(self.duration_ms)
    }
}

impl WavClockRenderer {
    pub fn new() -> Self {
        Self {
            state: None,
            monitor: None,
        }
    }

    fn release(&mut self) {
        if let Some(state) = self.state.take() {
            if let Ok(mut s) = state.lock() {
                s.released = true;
                s.playing_since = None;
            }
            if let Some(monitor) = self.monitor.take() {
                if monitor.join().is_err() {
                    warn!("render monitor panicked");
                }
            }
            info!("renderer released");
        }
    }
}

impl Default for WavClockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioRenderer for WavClockRenderer {
    fn open(&mut self, path: &Path) -> Result<mpsc::Receiver<RenderEvent>> {
        // Opening while another asset is loaded releases it first.
        self.release();

        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let frames = u64::from(reader.duration());
        let duration_ms = frames * 1000 / u64::from(spec.sample_rate);
        info!("renderer open: {} ({duration_ms} ms)", path.display());

        let state = Arc::new(Mutex::new(ClockState {
            duration_ms,
            base_ms: 0,
            playing_since: None,
            released: false,
            completed: false,
        }));

        let (events_tx, events_rx) = mpsc::channel(4);
        let monitor_state = Arc::clone(&state);
        let monitor = thread::spawn(move || loop {
            thread::sleep(Duration::from_millis(25));
            let Ok(mut s) = monitor_state.lock() else {
                break;
            };
            if s.released {
                break;
            }
            if s.playing_since.is_some() && s.position_ms() >= s.duration_ms {
                s.base_ms = s.duration_ms;
                s.playing_since = None;
                s.completed = true;
                drop(s);
                let _ = events_tx.try_send(RenderEvent::Completed);
            }
        });

        self.state = Some(state);
        self.monitor = Some(monitor);
        Ok(events_rx)
    }

    fn play(&mut self) {
        if let Some(state) = &self.state {
            if let Ok(mut s) = state.lock() {
                if s.playing_since.is_none() && !s.completed {
                    s.playing_since = Some(Instant::now());
                }
            }
        }
    }

    fn pause(&mut self) {
        if let Some(state) = &self.state {
            if let Ok(mut s) = state.lock() {
                s.base_ms = s.position_ms();
                s.playing_since = None;
            }
        }
    }

    fn stop(&mut self) {
        self.release();
    }

    fn seek(&mut self, position_ms: u64) {
        if let Some(state) = &self.state {
            if let Ok(mut s) = state.lock() {
                s.base_ms = position_ms.min(s.duration_ms);
                s.completed = false;
                if s.playing_since.is_some() {
                    s.playing_since = Some(Instant::now());
                }
            }
        }
    }

    fn position_ms(&self) -> Option<u64> {
        let state = self.state.as_ref()?;
        state.lock().ok().map(|s| s.position_ms())
    }

    fn duration_ms(&self) -> Option<u64> {
        let state = self.state.as_ref()?;
        state.lock().ok().map(|s| s.duration_ms)
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn name(&self) -> &str {
        "wav-clock-renderer"
    }
}

impl Drop for WavClockRenderer {
    fn drop(&mut self) {
        self.release();
    }
}
