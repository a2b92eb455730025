use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;

/// Event emitted by a capture device while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The configured maximum duration elapsed; the device has stopped
    /// and finalized the asset on its own.
    MaxDurationReached,
}

/// Audio capture capability.
///
/// The device records into the given file until `close` is called or the
/// maximum duration elapses, in which case it finalizes the asset itself
/// and reports `MaxDurationReached` on the returned channel. Open and
/// close are synchronous hardware calls that may block briefly.
pub trait AudioCapture: Send {
    /// Start recording into `path`, bounded by `max_duration`.
    ///
    /// A failed open must not leave a partial file behind.
    fn open(&mut self, path: &Path, max_duration: Duration)
        -> Result<mpsc::Receiver<CaptureEvent>>;

    /// Stop recording and finalize the asset. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Whether the device is currently recording.
    fn is_open(&self) -> bool;

    /// Filename extension for assets produced by this device.
    fn extension(&self) -> &str;

    /// Device name for logging.
    fn name(&self) -> &str;
}

/// Capture device that records a generated test tone into a WAV file.
///
/// Stands in for a platform microphone on the desktop: it produces real,
/// playable assets and honors the max-duration contract, which is all the
/// session layer depends on.
pub struct ToneCapture {
    sample_rate: u32,
    tone_hz: f64,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl ToneCapture {
    pub fn new() -> Self {
        Self {
            sample_rate: 16000,
            tone_hz: 440.0,
            worker: None,
        }
    }
}

impl Default for ToneCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for ToneCapture {
    fn open(
        &mut self,
        path: &Path,
        max_duration: Duration,
    ) -> Result<mpsc::Receiver<CaptureEvent>> {
        // Starting while already recording replaces the active capture.
        if self.worker.is_some() {
            self.close()?;
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        info!("capture open: {} (max {:?})", path.display(), max_duration);

        let (events_tx, events_rx) = mpsc::channel(4);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let sample_rate = self.sample_rate;
        let tone_hz = self.tone_hz;
        let path_for_log = path.to_path_buf();

        let handle = thread::spawn(move || {
            let started = Instant::now();
            let block = sample_rate as usize / 10; // 100 ms of samples
            let amplitude = 0.3 * f64::from(i16::MAX);
            let mut n: u64 = 0;

            loop {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
                for _ in 0..block {
                    let t = n as f64 / f64::from(sample_rate);
                    let sample = (amplitude
                        * (2.0 * std::f64::consts::PI * tone_hz * t).sin())
                        as i16;
                    if let Err(e) = writer.write_sample(sample) {
                        warn!("capture write failed: {e}");
                        break;
                    }
                    n += 1;
                }
                if started.elapsed() >= max_duration {
                    let _ = events_tx.try_send(CaptureEvent::MaxDurationReached);
                    break;
                }
                thread::sleep(Duration::from_millis(100));
            }

            if let Err(e) = writer.finalize() {
                warn!("could not finalize {}: {e}", path_for_log.display());
            }
        });

        self.worker = Some(CaptureWorker { stop, handle });
        Ok(events_rx)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            if worker.handle.join().is_err() {
                warn!("capture worker panicked");
            }
            info!("capture closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn extension(&self) -> &str {
        "wav"
    }

    fn name(&self) -> &str {
        "tone-capture"
    }
}

impl Drop for ToneCapture {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
