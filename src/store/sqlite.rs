use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::model::{LatLon, MapViewport, Place, Recording};
use crate::error::{Error, Result};

/// Durable storage for recordings, places, the selected place and the map
/// viewport.
///
/// All access is synchronous and single-threaded; concurrent callers go
/// through the writer in [`super::writer`]. Each public operation is one
/// SQLite transaction; a failed write leaves nothing partially applied.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file and its tables.
    ///
    /// Enables WAL mode and foreign keys.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        info!("store opened: {}", path.display());
        let store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// In-memory store for tests.
    ///
    /// Foreign keys are enabled so selection cascades behave as in
    /// production.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS recording (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                startDate TEXT NOT NULL,
                startTime TEXT NOT NULL,
                duration TEXT NOT NULL,
                filename TEXT NOT NULL,
                latitude TEXT NOT NULL,
                longitude TEXT NOT NULL,
                place TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS place (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                latitude TEXT NOT NULL,
                longitude TEXT NOT NULL,
                radius INTEGER NOT NULL CHECK (radius > 0));
            CREATE TABLE IF NOT EXISTS selected_place (
                place_id INTEGER UNIQUE REFERENCES place(id) ON DELETE CASCADE);
            CREATE TABLE IF NOT EXISTS map (
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                zoom REAL NOT NULL);",
        )?;
        Ok(())
    }

    // --- recordings ---

    /// Insert a recording and return its assigned id.
    pub fn insert_recording(&mut self, recording: &Recording) -> Result<i64> {
        debug!("insert_recording: {:?}", recording);
        self.conn.execute(
            "INSERT INTO recording
                (timestamp, startDate, startTime, duration, filename, latitude, longitude, place)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                recording.timestamp,
                recording.start_date,
                recording.start_time,
                recording.duration,
                recording.file.to_string_lossy(),
                recording.latitude,
                recording.longitude,
                recording.place,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Delete a recording row. Returns false if no row had the given id.
    pub fn delete_recording(&mut self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM recording WHERE id = ?1", params![id])?;
        debug!("delete_recording {id}: deleted = {deleted}");
        Ok(deleted > 0)
    }

    /// The recording with the given id, if any.
    pub fn recording(&self, id: i64) -> Result<Option<Recording>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, timestamp, startDate, startTime, duration, filename,
                        latitude, longitude, place
                 FROM recording WHERE id = ?1",
                params![id],
                row_to_recording,
            )
            .optional()?;
        Ok(row)
    }

    /// The newest recording (highest id), if any.
    pub fn latest_recording(&self) -> Result<Option<Recording>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, timestamp, startDate, startTime, duration, filename,
                        latitude, longitude, place
                 FROM recording ORDER BY id DESC LIMIT 1",
                [],
                row_to_recording,
            )
            .optional()?;
        Ok(row)
    }

    /// All recordings, ordered by timestamp ascending.
    pub fn recordings(&self) -> Result<Vec<Recording>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, startDate, startTime, duration, filename,
                    latitude, longitude, place
             FROM recording ORDER BY timestamp",
        )?;
        let rows = stmt.query_map([], row_to_recording)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of recordings.
    pub fn recordings_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM recording", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // --- places ---

    /// Insert a place and return its assigned id.
    pub fn insert_place(&mut self, place: &Place) -> Result<i64> {
        debug!("insert_place: {:?}", place);
        self.conn.execute(
            "INSERT INTO place (name, latitude, longitude, radius) VALUES (?1, ?2, ?3, ?4)",
            params![
                place.name,
                place.location.lat.to_string(),
                place.location.lon.to_string(),
                place.radius_m,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update an existing place. Fails with `NotFound` if the id is unknown.
    pub fn update_place(&mut self, place: &Place) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE place SET name = ?1, latitude = ?2, longitude = ?3, radius = ?4
             WHERE id = ?5",
            params![
                place.name,
                place.location.lat.to_string(),
                place.location.lon.to_string(),
                place.radius_m,
                place.id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound {
                entity: "place",
                id: place.id,
            });
        }
        Ok(())
    }

    /// The place with the given id, if any.
    pub fn place(&self, id: i64) -> Result<Option<Place>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, latitude, longitude, radius FROM place WHERE id = ?1",
                params![id],
                row_to_place,
            )
            .optional()?;
        Ok(row)
    }

    /// Delete a place row. Returns false if no row had the given id.
    ///
    /// A selection referencing the place is cleared by the foreign-key
    /// cascade.
    pub fn delete_place(&mut self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM place WHERE id = ?1", params![id])?;
        debug!("delete_place {id}: deleted = {deleted}");
        Ok(deleted > 0)
    }

    /// All places, ordered by name.
    pub fn places(&self) -> Result<Vec<Place>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, latitude, longitude, radius FROM place ORDER BY name")?;
        let rows = stmt.query_map([], row_to_place)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of places.
    pub fn places_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM place", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // --- selection ---

    /// Select the place with the given id, replacing any prior selection.
    ///
    /// Fails if the place does not exist (foreign-key constraint).
    pub fn select_place(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM selected_place", [])?;
        tx.execute(
            "INSERT INTO selected_place (place_id) VALUES (?1)",
            params![id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Clear any selection.
    pub fn deselect_place(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM selected_place", [])?;
        Ok(())
    }

    /// The id of the selected place, if any.
    pub fn selected_place(&self) -> Result<Option<i64>> {
        let row = self
            .conn
            .query_row("SELECT place_id FROM selected_place LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(row)
    }

    // --- map viewport ---

    /// Replace the persisted map viewport.
    pub fn set_viewport(&mut self, viewport: &MapViewport) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM map", [])?;
        tx.execute(
            "INSERT INTO map (latitude, longitude, zoom) VALUES (?1, ?2, ?3)",
            params![viewport.center.lat, viewport.center.lon, viewport.zoom],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The persisted map viewport, if any.
    pub fn viewport(&self) -> Result<Option<MapViewport>> {
        let row = self
            .conn
            .query_row("SELECT latitude, longitude, zoom FROM map LIMIT 1", [], |row| {
                Ok(MapViewport {
                    center: LatLon::new(row.get(0)?, row.get(1)?),
                    zoom: row.get(2)?,
                })
            })
            .optional()?;
        Ok(row)
    }
}

fn row_to_recording(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recording> {
    Ok(Recording {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        start_date: row.get(2)?,
        start_time: row.get(3)?,
        duration: row.get(4)?,
        file: PathBuf::from(row.get::<_, String>(5)?),
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        place: row.get(8)?,
    })
}

fn row_to_place(row: &rusqlite::Row<'_>) -> rusqlite::Result<Place> {
    let lat: String = row.get(2)?;
    let lon: String = row.get(3)?;
    Ok(Place {
        id: row.get(0)?,
        name: row.get(1)?,
        location: LatLon::new(
            lat.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            lon.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        ),
        radius_m: row.get(4)?,
    })
}
