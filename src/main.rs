use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use voicemark::{
    Config, FixedLocationSource, LatLon, LocationSource, Place, PlacesRepository, PlaybackState,
    PlaybackSession, RecordingSession, RecordingsRepository, Store, StoreHandle, ToneCapture,
    WavClockRenderer,
};

#[derive(Parser)]
#[command(name = "voicemark", about = "Place-tagged voice recorder")]
struct Cli {
    /// Configuration file (without extension, resolved by the config crate)
    #[arg(short, long, default_value = "config/voicemark")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all recordings
    List,
    /// Record with the built-in tone capture, then stop and persist
    Record {
        /// Seconds to record before stopping (bounded by the configured
        /// maximum duration)
        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },
    /// Play a recording to completion
    Play { id: i64 },
    /// Delete a recording and its audio asset
    Delete { id: i64 },
    /// List all places
    Places,
    /// Add a place
    AddPlace {
        name: String,
        latitude: f64,
        longitude: f64,
        /// Proximity zone radius in meters
        #[arg(long, default_value_t = 100)]
        radius: u32,
    },
    /// Select a place (replaces any prior selection)
    SelectPlace { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config).context("failed to load configuration")?;

    let store = Store::open(&cfg.storage.database_path)?;
    let store = StoreHandle::spawn(store);

    let location: Arc<dyn LocationSource> = match &cfg.location {
        Some(l) => Arc::new(FixedLocationSource::new(LatLon::new(l.latitude, l.longitude))),
        None => Arc::new(FixedLocationSource::unavailable()),
    };
    let places = Arc::new(PlacesRepository::new(store.clone(), location).await?);
    let recordings = Arc::new(RecordingsRepository::new(&cfg.storage.recordings_dir, store).await?);

    match cli.command {
        Command::List => {
            let all = recordings.watch_recordings().borrow().clone();
            if all.is_empty() {
                println!("no recordings");
            }
            for r in all.iter() {
                println!(
                    "{:>4}  {} {}  {}  {:20}  {}",
                    r.id,
                    r.start_date,
                    r.start_time,
                    r.duration,
                    r.place,
                    r.file.display()
                );
            }
        }
        Command::Record { seconds } => {
            let session = RecordingSession::start(
                Arc::clone(&recordings),
                Arc::clone(&places),
                Box::new(ToneCapture::new()),
                cfg.max_recording_duration(),
            )
            .await?;
            info!("recording for {seconds}s...");
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            match session.stop().await? {
                Some(id) => println!("persisted recording {id}"),
                // The configured maximum elapsed first; the session
                // already persisted on its own.
                None => session.wait_closed().await,
            }
        }
        Command::Play { id } => {
            let session =
                PlaybackSession::start(&recordings, Box::new(WavClockRenderer::new()), id).await?;
            if *session.watch_state().borrow() == PlaybackState::Stopped {
                println!("no recording with id {id}");
            } else {
                let mut position = session.watch_position();
                let mut state = session.watch_state();
                loop {
                    tokio::select! {
                        changed = state.changed() => {
                            if changed.is_err() || *state.borrow() == PlaybackState::Stopped {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(Duration::from_millis(250)) => {
                            println!("{}", position.borrow_and_update().display);
                        }
                    }
                }
                println!("playback finished");
            }
        }
        Command::Delete { id } => {
            recordings.delete_recording(id).await?;
            println!("deleted recording {id}");
        }
        Command::Places => {
            let all = places.watch_places().borrow().clone();
            let selected = *places.watch_selected().borrow();
            if all.is_empty() {
                println!("no places");
            }
            for p in all.iter() {
                let marker = if selected == Some(p.id) { "*" } else { " " };
                println!(
                    "{marker}{:>3}  {:20}  {:.5}, {:.5}  r={}m",
                    p.id, p.name, p.location.lat, p.location.lon, p.radius_m
                );
            }
        }
        Command::AddPlace {
            name,
            latitude,
            longitude,
            radius,
        } => {
            let id = places
                .add_place(Place {
                    id: 0,
                    name,
                    location: LatLon::new(latitude, longitude),
                    radius_m: radius,
                })
                .await?;
            println!("added place {id}");
        }
        Command::SelectPlace { id } => {
            places.select_place(id).await?;
            println!("selected place {id}");
        }
    }

    Ok(())
}
