use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub recording: RecordingConfig,
    /// Optional static location fix; without it every lookup reports
    /// location-unavailable and recordings carry empty location fields.
    pub location: Option<LocationConfig>,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub database_path: String,
    pub recordings_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// Upper bound for a single recording; the session auto-stops when it
    /// is reached.
    pub max_duration_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn max_recording_duration(&self) -> Duration {
        Duration::from_secs(self.recording.max_duration_secs)
    }
}
