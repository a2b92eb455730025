use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::ReactiveTable;
use crate::error::Result;
use crate::location::{self, LocationSource};
use crate::store::{LatLon, MapViewport, Place, StoreHandle};

/// Reactive repository for places, the single selected place and the map
/// viewport.
///
/// Same discipline as [`super::RecordingsRepository`]: every mutation runs
/// on the store writer and republishes the affected snapshots from inside
/// the writer job.
pub struct PlacesRepository {
    store: StoreHandle,
    location: Arc<dyn LocationSource>,
    table: ReactiveTable<Place>,
    selected_tx: watch::Sender<Option<i64>>,
    viewport_tx: watch::Sender<Option<MapViewport>>,
}

impl PlacesRepository {
    /// Create the repository, loading the current snapshot from the store.
    pub async fn new(store: StoreHandle, location: Arc<dyn LocationSource>) -> Result<Self> {
        let (places, selected, viewport) = store
            .run(|s| Ok((s.places()?, s.selected_place()?, s.viewport()?)))
            .await?;
        let table = ReactiveTable::new(places);
        let (selected_tx, _) = watch::channel(selected);
        let (viewport_tx, _) = watch::channel(viewport);

        Ok(Self {
            store,
            location,
            table,
            selected_tx,
            viewport_tx,
        })
    }

    /// All places, ordered by name, republished after every mutation.
    pub fn watch_places(&self) -> watch::Receiver<Arc<Vec<Place>>> {
        self.table.watch_rows()
    }

    /// Number of places.
    pub fn watch_count(&self) -> watch::Receiver<usize> {
        self.table.watch_count()
    }

    /// Id of the selected place, if any.
    pub fn watch_selected(&self) -> watch::Receiver<Option<i64>> {
        self.selected_tx.subscribe()
    }

    /// The persisted map viewport, if any.
    pub fn watch_viewport(&self) -> watch::Receiver<Option<MapViewport>> {
        self.viewport_tx.subscribe()
    }

    /// Persist a place and republish the snapshot. Returns the assigned id.
    pub async fn add_place(&self, place: Place) -> Result<i64> {
        debug!("add_place: {}", place.name);
        let table = self.table.clone();
        self.store
            .run(move |s| {
                let id = s.insert_place(&place)?;
                table.publish(s.places()?);
                Ok(id)
            })
            .await
    }

    /// Update an existing place. Fails with `NotFound` for an unknown id.
    pub async fn update_place(&self, place: Place) -> Result<()> {
        let table = self.table.clone();
        self.store
            .run(move |s| {
                s.update_place(&place)?;
                table.publish(s.places()?);
                Ok(())
            })
            .await
    }

    /// Delete a place; a selection pointing at it is cleared as a side
    /// effect. Deleting an unknown id is a no-op.
    pub async fn delete_place(&self, id: i64) -> Result<()> {
        let table = self.table.clone();
        let selected_tx = self.selected_tx.clone();
        self.store
            .run(move |s| {
                let was_selected = s.selected_place()? == Some(id);
                if !s.delete_place(id)? {
                    return Ok(());
                }
                table.publish(s.places()?);
                if was_selected {
                    // The foreign-key cascade already dropped the row.
                    selected_tx.send_replace(s.selected_place()?);
                }
                Ok(())
            })
            .await
    }

    /// The place with the given id, if any.
    pub async fn place(&self, id: i64) -> Result<Option<Place>> {
        self.store.run(move |s| s.place(id)).await
    }

    /// Select a place, replacing any prior selection.
    pub async fn select_place(&self, id: i64) -> Result<()> {
        let selected_tx = self.selected_tx.clone();
        self.store
            .run(move |s| {
                s.select_place(id)?;
                selected_tx.send_replace(s.selected_place()?);
                Ok(())
            })
            .await
    }

    /// Clear any selection.
    pub async fn deselect_place(&self) -> Result<()> {
        let selected_tx = self.selected_tx.clone();
        self.store
            .run(move |s| {
                s.deselect_place()?;
                selected_tx.send_replace(s.selected_place()?);
                Ok(())
            })
            .await
    }

    /// Id of the selected place, if any.
    pub async fn selected_place(&self) -> Result<Option<i64>> {
        self.store.run(|s| s.selected_place()).await
    }

    /// Replace the persisted map viewport.
    pub async fn set_viewport(&self, viewport: MapViewport) -> Result<()> {
        let viewport_tx = self.viewport_tx.clone();
        self.store
            .run(move |s| {
                s.set_viewport(&viewport)?;
                viewport_tx.send_replace(s.viewport()?);
                Ok(())
            })
            .await
    }

    /// The persisted map viewport, if any.
    pub async fn viewport(&self) -> Result<Option<MapViewport>> {
        self.store.run(|s| s.viewport()).await
    }

    /// Ask the location source for one fix.
    ///
    /// Suspends until the source produces a fix or fails; dropping the
    /// future abandons the lookup (the source contract guarantees it
    /// unsubscribes).
    pub async fn current_location(&self) -> Result<LatLon> {
        self.location.current_fix().await
    }

    /// The nearest place whose proximity zone contains the fix, resolved
    /// against the current snapshot.
    pub fn closest_place(&self, fix: LatLon) -> Option<Place> {
        let places = self.table.borrow_rows();
        location::closest(fix, &places).cloned()
    }
}
