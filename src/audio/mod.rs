//! Audio capture and render capabilities
//!
//! Narrow traits over the platform's capture/render hardware, consumed by
//! the session controllers. The shipped implementations are file-backed:
//! [`ToneCapture`] writes real WAV assets, [`WavClockRenderer`] plays them
//! back on a monotonic clock.

mod capture;
mod render;

pub use capture::{AudioCapture, CaptureEvent, ToneCapture};
pub use render::{AudioRenderer, RenderEvent, WavClockRenderer};
