use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::ReactiveTable;
use crate::error::Result;
use crate::store::{Recording, StoreHandle};

/// Reactive repository for audio recordings.
///
/// Wraps the store behind watch-channel snapshots that are republished
/// after every mutation. The republish happens inside the store writer's
/// job, so subscribers observe mutation→republish pairs in the order the
/// mutations were issued, and every published snapshot is a verbatim
/// re-read of the store.
pub struct RecordingsRepository {
    recordings_dir: PathBuf,
    store: StoreHandle,
    table: ReactiveTable<Recording>,
    latest_tx: watch::Sender<Option<Recording>>,
}

impl RecordingsRepository {
    /// Create the repository, loading the current snapshot from the store.
    ///
    /// `recordings_dir` is where audio assets live; it is created if
    /// missing.
    pub async fn new(recordings_dir: impl Into<PathBuf>, store: StoreHandle) -> Result<Self> {
        let recordings_dir = recordings_dir.into();
        std::fs::create_dir_all(&recordings_dir)?;

        let (recordings, latest) = store
            .run(|s| Ok((s.recordings()?, s.latest_recording()?)))
            .await?;
        let table = ReactiveTable::new(recordings);
        let (latest_tx, _) = watch::channel(latest);

        Ok(Self {
            recordings_dir,
            store,
            table,
            latest_tx,
        })
    }

    /// Absolute path of the audio asset with the given file name.
    pub fn recording_file(&self, name: &str) -> PathBuf {
        self.recordings_dir.join(name)
    }

    /// All recordings, ordered by timestamp ascending, republished after
    /// every mutation.
    pub fn watch_recordings(&self) -> watch::Receiver<Arc<Vec<Recording>>> {
        self.table.watch_rows()
    }

    /// Number of recordings.
    pub fn watch_count(&self) -> watch::Receiver<usize> {
        self.table.watch_count()
    }

    /// The newest recording, if any.
    pub fn watch_latest(&self) -> watch::Receiver<Option<Recording>> {
        self.latest_tx.subscribe()
    }

    /// Persist a recording and republish the snapshot. Returns the
    /// assigned id.
    pub async fn add_recording(&self, recording: Recording) -> Result<i64> {
        debug!("add_recording: {:?}", recording.file);
        let table = self.table.clone();
        let latest_tx = self.latest_tx.clone();
        self.store
            .run(move |s| {
                let id = s.insert_recording(&recording)?;
                table.publish(s.recordings()?);
                latest_tx.send_replace(s.latest_recording()?);
                Ok(id)
            })
            .await
    }

    /// Delete a recording row and its audio asset.
    ///
    /// The store row goes first; the asset file is removed afterwards, and
    /// a failure to remove it is logged but not fatal (the record is
    /// already gone). Deleting an unknown id is a no-op.
    pub async fn delete_recording(&self, id: i64) -> Result<()> {
        let table = self.table.clone();
        let latest_tx = self.latest_tx.clone();
        let removed_asset = self
            .store
            .run(move |s| {
                let file = s.recording(id)?.map(|r| r.file);
                let was_latest = s.latest_recording()?.map(|r| r.id) == Some(id);
                if !s.delete_recording(id)? {
                    return Ok(None);
                }
                table.publish(s.recordings()?);
                if was_latest {
                    latest_tx.send_replace(s.latest_recording()?);
                }
                Ok(file)
            })
            .await?;

        if let Some(file) = removed_asset {
            if let Err(e) = std::fs::remove_file(&file) {
                warn!("could not delete asset {}: {}", file.display(), e);
            }
        }
        Ok(())
    }

    /// The recording with the given id, if any.
    pub async fn recording(&self, id: i64) -> Result<Option<Recording>> {
        self.store.run(move |s| s.recording(id)).await
    }

    /// The newest recording, if any.
    pub async fn latest_recording(&self) -> Result<Option<Recording>> {
        self.store.run(|s| s.latest_recording()).await
    }
}
