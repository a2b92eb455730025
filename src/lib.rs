pub mod audio;
pub mod config;
pub mod error;
pub mod location;
pub mod repository;
pub mod session;
pub mod store;

pub use audio::{AudioCapture, AudioRenderer, CaptureEvent, RenderEvent, ToneCapture, WavClockRenderer};
pub use config::Config;
pub use error::{Error, Result};
pub use location::{closest, distance_m, FixedLocationSource, LocationSource};
pub use repository::{PlacesRepository, RecordingsRepository};
pub use session::{
    PlaybackPosition, PlaybackSession, PlaybackState, RecordingSession, RecordingState,
};
pub use store::{LatLon, MapViewport, Place, Recording, Store, StoreHandle};
