//! Session controllers
//!
//! Each session is a small state machine coordinating a capture/render
//! capability with the repositories:
//! - `RecordingSession`: audio capture + concurrent location lookup,
//!   persisting a `Recording` on stop
//! - `PlaybackSession`: audio render of a stored recording with transport
//!   controls and position polling

mod play;
mod record;

pub use play::{PlaybackPosition, PlaybackSession, PlaybackState};
pub use record::{RecordingSession, RecordingState};
