use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use travel_journal::audio::StagedFileCapture;
use travel_journal::location::{CachedLocation, LocationFix};
use travel_journal::network::{IpInfo, IpLookup};
use travel_journal::recording::{RecordingCoordinator, SessionState};
use travel_journal::storage::{StorageError, TripStorage};

struct Unreachable;

#[async_trait]
impl IpLookup for Unreachable {
    async fn fetch_public_ip(&self) -> anyhow::Result<IpInfo> {
        Err(anyhow::anyhow!("dns lookup failed"))
    }
}

#[tokio::test]
async fn coast_drive_scenario() {
    let dir = TempDir::new().unwrap();
    let storage = TripStorage::with_base_directory(dir.path()).await.unwrap();

    let trip = storage.create_trip("Coast Drive").await.unwrap();
    let t0 = trip.created_at;
    assert_eq!(storage.load_trip(&trip.id).await.unwrap(), trip);

    let audio = dir.path().join("a.m4a");
    std::fs::write(&audio, b"fake aac").unwrap();
    let e1 = storage
        .save_entry(&trip.id, "hello world", Some(&audio))
        .await
        .unwrap();

    assert_eq!(e1.transcript, "hello world");
    assert_eq!(e1.audio_file_name, Some(format!("{}.m4a", e1.id)));
    let stored_audio = dir
        .path()
        .join("Trips")
        .join(trip.id.to_string())
        .join("entries")
        .join(format!("{}.m4a", e1.id));
    assert!(stored_audio.exists());
    assert!(!audio.exists());
    assert!(storage.load_trip(&trip.id).await.unwrap().updated_at > t0);

    let e2 = storage.save_entry(&trip.id, "second stop", None).await.unwrap();
    assert_ne!(e1.id, e2.id);
    let entries = storage.list_entries(&trip.id).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, e1.id);
    assert_eq!(entries[1].id, e2.id);
    assert!(entries[0].created_at <= entries[1].created_at);

    storage.delete_trip(&trip.id).await.unwrap();
    storage.delete_trip(&trip.id).await.unwrap();
    assert!(matches!(
        storage.load_trip(&trip.id).await,
        Err(StorageError::TripNotFound(_))
    ));
    assert!(storage.list_trips().await.is_empty());
}

#[tokio::test]
async fn recording_with_failed_ip_lookup() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(TripStorage::with_base_directory(dir.path()).await.unwrap());
    let trip = storage.create_trip("Mountain Pass").await.unwrap();

    let location = Arc::new(CachedLocation::new());
    location.update_fix(LocationFix {
        latitude: 46.5547,
        longitude: 8.5614,
        horizontal_accuracy: 15.0,
    });
    location.update_placemark(Some("Furka Pass, Switzerland".to_string()));

    let recorder = RecordingCoordinator::new(
        storage.clone(),
        Arc::new(StagedFileCapture::new(dir.path().join("capture"))),
        location,
        Arc::new(Unreachable),
    )
    .with_ip_timeout(Duration::from_secs(1));

    let handle = recorder.begin_session(&trip.id).await.unwrap();
    std::fs::write(&handle.path, b"fake aac").unwrap();
    let entry = recorder.end_session("switchbacks all the way up").await.unwrap();
    assert_eq!(recorder.state(), SessionState::Committed);

    let stored = storage.load_entry(&trip.id, &entry.id).await.unwrap();
    assert_eq!(stored.public_ip, None);
    assert_eq!(stored.transcript, "switchbacks all the way up");
    assert_eq!(stored.audio_file_name, Some(format!("{}.m4a", entry.id)));
    assert!(stored.audio_duration_seconds.unwrap() >= 0.0);
    let snapshot = stored.location.clone().unwrap();
    assert_eq!(snapshot.latitude, 46.5547);
    assert_eq!(snapshot.placemark_description.as_deref(), Some("Furka Pass, Switzerland"));
    assert!(storage.audio_path(&stored).unwrap().exists());
}
