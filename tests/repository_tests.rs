// Integration tests for the reactive repositories
//
// These tests verify that every published snapshot matches a direct
// re-read of the store, that asset files share the row's lifetime, and
// that concurrent mutations serialize through the single writer.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use voicemark::{
    Error, FixedLocationSource, LatLon, MapViewport, Place, PlacesRepository, Recording,
    RecordingsRepository, Store, StoreHandle,
};

fn recording(timestamp: i64, file: PathBuf) -> Recording {
    Recording {
        id: 0,
        timestamp,
        start_date: "03.07.".to_string(),
        start_time: "08:36".to_string(),
        duration: "00:05".to_string(),
        file,
        latitude: String::new(),
        longitude: String::new(),
        place: String::new(),
    }
}

fn place(name: &str, lat: f64, lon: f64, radius_m: u32) -> Place {
    Place {
        id: 0,
        name: name.to_string(),
        location: LatLon::new(lat, lon),
        radius_m,
    }
}

async fn recordings_repo(temp_dir: &TempDir) -> Result<(RecordingsRepository, PathBuf)> {
    let db_path = temp_dir.path().join("test.db");
    let store = StoreHandle::spawn(Store::open(&db_path)?);
    let repo = RecordingsRepository::new(temp_dir.path().join("recordings"), store).await?;
    Ok((repo, db_path))
}

async fn places_repo(temp_dir: &TempDir) -> Result<PlacesRepository> {
    let store = StoreHandle::spawn(Store::open(temp_dir.path().join("test.db"))?);
    let location = Arc::new(FixedLocationSource::unavailable());
    Ok(PlacesRepository::new(store, location).await?)
}

#[tokio::test]
async fn snapshot_matches_a_direct_store_reread_after_every_mutation() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, db_path) = recordings_repo(&temp_dir).await?;
    let snapshot = repo.watch_recordings();

    let mut ids = Vec::new();
    for timestamp in [300, 100, 200] {
        let file = repo.recording_file(&format!("{timestamp}.wav"));
        ids.push(repo.add_recording(recording(timestamp, file)).await?);

        // Verify through an independent connection on the same file.
        let direct = Store::open(&db_path)?.recordings()?;
        assert_eq!(**snapshot.borrow(), direct);
    }

    repo.delete_recording(ids[0]).await?;
    let direct = Store::open(&db_path)?.recordings()?;
    assert_eq!(**snapshot.borrow(), direct);

    let timestamps: Vec<i64> = snapshot.borrow().iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![100, 200], "ordered by timestamp");

    Ok(())
}

#[tokio::test]
async fn count_and_latest_projections_follow_mutations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, _) = recordings_repo(&temp_dir).await?;

    assert_eq!(*repo.watch_count().borrow(), 0);
    assert_eq!(*repo.watch_latest().borrow(), None);

    let first = repo
        .add_recording(recording(100, repo.recording_file("100.wav")))
        .await?;
    let second = repo
        .add_recording(recording(50, repo.recording_file("50.wav")))
        .await?;

    assert_eq!(*repo.watch_count().borrow(), 2);
    assert_eq!(
        repo.watch_latest().borrow().as_ref().map(|r| r.id),
        Some(second),
        "latest is the newest row even with an older timestamp"
    );

    // Deleting the latest row moves the projection to the remaining one.
    repo.delete_recording(second).await?;
    assert_eq!(
        repo.watch_latest().borrow().as_ref().map(|r| r.id),
        Some(first)
    );

    repo.delete_recording(first).await?;
    assert_eq!(*repo.watch_count().borrow(), 0);
    assert_eq!(*repo.watch_latest().borrow(), None);

    Ok(())
}

#[tokio::test]
async fn delete_recording_removes_the_row_and_the_asset() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, db_path) = recordings_repo(&temp_dir).await?;

    let asset = repo.recording_file("100.wav");
    std::fs::write(&asset, b"fake wav data")?;

    let id = repo.add_recording(recording(100, asset.clone())).await?;
    assert!(asset.exists());

    repo.delete_recording(id).await?;
    assert!(!asset.exists(), "asset must be deleted with the row");
    assert_eq!(Store::open(&db_path)?.recordings_count()?, 0);

    Ok(())
}

#[tokio::test]
async fn delete_survives_a_missing_asset_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, _) = recordings_repo(&temp_dir).await?;

    // Asset was never written; the row must still go away.
    let id = repo
        .add_recording(recording(100, repo.recording_file("gone.wav")))
        .await?;
    repo.delete_recording(id).await?;
    assert_eq!(*repo.watch_count().borrow(), 0);

    Ok(())
}

#[tokio::test]
async fn concurrent_adds_serialize_through_the_single_writer() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, db_path) = recordings_repo(&temp_dir).await?;
    let repo = Arc::new(repo);

    let mut handles = Vec::new();
    for i in 0..10 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            let file = repo.recording_file(&format!("{i}.wav"));
            repo.add_recording(recording(i, file)).await
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await??);
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10, "every add got a distinct id");
    assert_eq!(*repo.watch_count().borrow(), 10);
    assert_eq!(**repo.watch_recordings().borrow(), Store::open(&db_path)?.recordings()?);

    Ok(())
}

#[tokio::test]
async fn places_snapshot_selection_and_viewport_follow_mutations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = places_repo(&temp_dir).await?;

    let a = repo.add_place(place("atelier", 52.0, 9.0, 50)).await?;
    let b = repo.add_place(place("bakery", 52.1, 9.1, 80)).await?;
    assert_eq!(*repo.watch_count().borrow(), 2);

    repo.select_place(a).await?;
    repo.select_place(b).await?;
    assert_eq!(
        *repo.watch_selected().borrow(),
        Some(b),
        "selection is replaced, not additive"
    );

    repo.delete_place(b).await?;
    assert_eq!(*repo.watch_selected().borrow(), None);
    let names: Vec<String> = repo
        .watch_places()
        .borrow()
        .iter()
        .map(|p| p.name.clone())
        .collect();
    assert_eq!(names, vec!["atelier"]);

    repo.set_viewport(MapViewport {
        center: LatLon::new(52.0, 9.0),
        zoom: 13.0,
    })
    .await?;
    let viewport = *repo.watch_viewport().borrow();
    assert_eq!(viewport.map(|v| v.zoom), Some(13.0));

    Ok(())
}

#[tokio::test]
async fn update_place_republishes_and_reports_missing_ids() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = places_repo(&temp_dir).await?;

    let id = repo.add_place(place("cafe", 52.0, 9.0, 50)).await?;
    repo.update_place(Place {
        id,
        name: "cafe nord".to_string(),
        location: LatLon::new(52.5, 9.5),
        radius_m: 60,
    })
    .await?;
    assert_eq!(repo.watch_places().borrow()[0].name, "cafe nord");

    let missing = repo.update_place(place("ghost", 0.0, 0.0, 10)).await;
    assert!(matches!(missing, Err(Error::NotFound { .. })));

    Ok(())
}

#[tokio::test]
async fn closest_place_resolves_against_the_current_snapshot() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = places_repo(&temp_dir).await?;

    let fix = LatLon::new(52.3832, 9.7195);
    // ~11 m and ~55 m north of the fix, zones overlapping at the fix.
    let near = repo
        .add_place(place("near", fix.lat + 0.0001, fix.lon, 200))
        .await?;
    repo.add_place(place("far", fix.lat + 0.0005, fix.lon, 200))
        .await?;

    assert_eq!(repo.closest_place(fix).map(|p| p.id), Some(near));

    repo.delete_place(near).await?;
    assert_eq!(
        repo.closest_place(fix).map(|p| p.name),
        Some("far".to_string()),
        "resolution follows the republished snapshot"
    );

    Ok(())
}

#[tokio::test]
async fn current_location_surfaces_unavailability() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = places_repo(&temp_dir).await?;

    let result = repo.current_location().await;
    assert!(matches!(result, Err(Error::LocationUnavailable(_))));

    Ok(())
}
