// src/storage/mod.rs
//! File-based storage for trips and entries
//!
//! Every document write goes to a sibling temp file first and is renamed into
//! place, so readers only ever see complete `trip.json` / `<entry>.json` files.
//! Bulk listings are lenient: an unreadable item is logged and skipped.

pub mod error;
pub mod models;
pub mod paths;

pub use error::{Result, StorageError};
pub use models::{Entry, LocationSnapshot, Trip};
pub use paths::TripPaths;

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Name of the directory placed under the application's base directory.
pub const ROOT_DIR_NAME: &str = "Trips";

#[derive(Debug, Clone)]
pub struct TripStorage {
    paths: TripPaths,
}

impl TripStorage {
    /// Open storage rooted at `root`, creating it (and its parents) if needed.
    pub async fn initialize(root: impl Into<PathBuf>) -> Result<Self> {
        let paths = TripPaths::new(root);
        ensure_dir(paths.root()).await?;
        info!("Trip storage ready at {}", paths.root().display());
        Ok(Self { paths })
    }

    /// Open storage at `<base_directory>/Trips`.
    pub async fn with_base_directory(base_directory: impl AsRef<Path>) -> Result<Self> {
        Self::initialize(base_directory.as_ref().join(ROOT_DIR_NAME)).await
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn paths(&self) -> &TripPaths {
        &self.paths
    }

    // Trip operations

    pub async fn create_trip(&self, title: &str) -> Result<Trip> {
        self.insert_trip(Trip::new(title)).await
    }

    async fn insert_trip(&self, trip: Trip) -> Result<Trip> {
        let trip_dir = self.paths.trip_dir(&trip.id);
        ensure_dir(&trip_dir).await?;
        ensure_dir(&self.paths.entries_dir(&trip.id)).await?;

        if let Err(e) = write_document(&trip, &self.paths.trip_index_file(&trip.id)).await {
            // Without an index the directory is invisible to listings; drop it anyway.
            let _ = fs::remove_dir_all(&trip_dir).await;
            return Err(e);
        }

        info!("[{}] Created trip \"{}\"", trip.id, trip.title);
        Ok(trip)
    }

    /// All readable trips, oldest first.
    pub async fn list_trips(&self) -> Vec<Trip> {
        let mut dir = match fs::read_dir(self.paths.root()).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Cannot read trips directory {}: {}", self.paths.root().display(), e);
                return Vec::new();
            }
        };

        let mut trips = Vec::new();
        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!("Trip scan of {} stopped early: {}", self.paths.root().display(), e);
                    break;
                }
            };
            if is_hidden(&item.path()) {
                continue;
            }
            match item.file_type().await {
                Ok(kind) if kind.is_dir() => {}
                _ => continue,
            }
            let index = item.path().join(paths::TRIP_INDEX_FILE);
            match read_document::<Trip>(&index).await {
                Ok(Some(trip)) => trips.push(trip),
                Ok(None) => debug!("Skipping {}: no trip index", item.path().display()),
                Err(e) => warn!("Skipping unreadable trip at {}: {}", item.path().display(), e),
            }
        }

        trips.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        trips
    }

    pub async fn load_trip(&self, id: &Uuid) -> Result<Trip> {
        read_document(&self.paths.trip_index_file(id))
            .await?
            .ok_or(StorageError::TripNotFound(*id))
    }

    pub async fn rename_trip(&self, id: &Uuid, title: &str) -> Result<Trip> {
        let mut trip = self.load_trip(id).await?;
        trip.title = title.to_string();
        bump_updated_at(&mut trip);
        write_document(&trip, &self.paths.trip_index_file(id)).await?;
        info!("[{}] Renamed trip to \"{}\"", id, trip.title);
        Ok(trip)
    }

    /// Remove the trip and everything under it. Missing trips are not an error.
    pub async fn delete_trip(&self, id: &Uuid) -> Result<()> {
        match fs::remove_dir_all(self.paths.trip_dir(id)).await {
            Ok(()) => {
                info!("[{}] Deleted trip", id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::FileOperationFailed(format!(
                "Failed to delete trip {}: {}",
                id, e
            ))),
        }
    }

    // Entry operations

    /// Create an entry, moving `audio_source` (if any) next to its JSON.
    pub async fn save_entry(
        &self,
        trip_id: &Uuid,
        transcript: &str,
        audio_source: Option<&Path>,
    ) -> Result<Entry> {
        self.load_trip(trip_id).await?;

        let mut entry = Entry::new(*trip_id, transcript);
        ensure_dir(&self.paths.entries_dir(trip_id)).await?;

        if let Some(source) = audio_source {
            let dest = self.paths.entry_audio_file(trip_id, &entry.id);
            relocate_audio(source, &dest).await?;
            entry.audio_file_name = Some(paths::audio_file_name(&entry.id));
        }

        write_document(&entry, &self.paths.entry_json_file(trip_id, &entry.id)).await?;
        self.touch_trip(trip_id).await?;

        info!("[{}] Saved entry {}", trip_id, entry.id);
        Ok(entry)
    }

    /// All readable entries of a trip, oldest first. Non-JSON files are ignored.
    pub async fn list_entries(&self, trip_id: &Uuid) -> Vec<Entry> {
        let entries_dir = self.paths.entries_dir(trip_id);
        let mut dir = match fs::read_dir(&entries_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                debug!("[{}] No entries directory: {}", trip_id, e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!("[{}] Entry scan stopped early: {}", trip_id, e);
                    break;
                }
            };
            let path = item.path();
            if is_hidden(&path) || !has_extension(&path, paths::ENTRY_EXTENSION) {
                continue;
            }
            match read_document::<Entry>(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!("[{}] Skipping unreadable entry {}: {}", trip_id, path.display(), e),
            }
        }

        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        entries
    }

    pub async fn load_entry(&self, trip_id: &Uuid, entry_id: &Uuid) -> Result<Entry> {
        read_document(&self.paths.entry_json_file(trip_id, entry_id))
            .await?
            .ok_or(StorageError::EntryNotFound(*entry_id))
    }

    /// Remove an entry's JSON and audio (each only if present), then bump the trip.
    pub async fn delete_entry(&self, trip_id: &Uuid, entry_id: &Uuid) -> Result<()> {
        remove_if_present(&self.paths.entry_json_file(trip_id, entry_id)).await?;
        remove_if_present(&self.paths.entry_audio_file(trip_id, entry_id)).await?;
        self.touch_trip(trip_id).await?;
        info!("[{}] Deleted entry {}", trip_id, entry_id);
        Ok(())
    }

    /// Atomically replace an existing entry's JSON with `entry`.
    pub async fn overwrite_entry(&self, entry: &Entry) -> Result<()> {
        write_document(entry, &self.paths.entry_json_file(&entry.trip_id, &entry.id)).await?;
        debug!("[{}] Overwrote entry {}", entry.trip_id, entry.id);
        Ok(())
    }

    /// Where the entry's audio blob lives, if it has one.
    pub fn audio_path(&self, entry: &Entry) -> Option<PathBuf> {
        entry
            .audio_file_name
            .as_ref()
            .map(|name| self.paths.entries_dir(&entry.trip_id).join(name))
    }

    /// Write an arbitrary text file inside the storage tree atomically.
    pub async fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        write_atomic(path, contents.as_bytes())
            .await
            .map_err(|e| StorageError::FileOperationFailed(format!("Failed to write {}: {}", path.display(), e)))
    }

    async fn touch_trip(&self, trip_id: &Uuid) -> Result<Trip> {
        let mut trip = self.load_trip(trip_id).await?;
        bump_updated_at(&mut trip);
        write_document(&trip, &self.paths.trip_index_file(trip_id)).await?;
        Ok(trip)
    }
}

// updatedAt never moves backwards, even if the clock does.
fn bump_updated_at(trip: &mut Trip) {
    let now = Utc::now();
    trip.updated_at = if now > trip.updated_at {
        now
    } else {
        trip.updated_at + Duration::nanoseconds(1)
    };
}

async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| StorageError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_document<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let content = models::to_document(value).map_err(|e| StorageError::EncodingFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_atomic(path, content.as_bytes())
        .await
        .map_err(|e| StorageError::EncodingFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// `Ok(None)` when the file does not exist.
async fn read_document<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::FileOperationFailed(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    models::from_document(&content)
        .map(Some)
        .map_err(|source| StorageError::DecodingFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Write to `.<name>.<uuid>.tmp` beside `path`, sync, then rename over `path`.
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    let result = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// Move `source` to `dest`; if the rename fails (e.g. across volumes) copy
/// into place and remove the source.
async fn relocate_audio(source: &Path, dest: &Path) -> Result<()> {
    remove_if_present(dest).await?;

    let move_err = match fs::rename(source, dest).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(
        "Moving audio {} failed ({}), falling back to copy",
        source.display(),
        move_err
    );

    let tmp = temp_sibling(dest);
    let copied = async {
        fs::copy(source, &tmp).await?;
        fs::rename(&tmp, dest).await
    }
    .await;

    if let Err(copy_err) = copied {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::FileOperationFailed(format!(
            "Move/copy audio failed: move: {}, copy: {}",
            move_err, copy_err
        )));
    }

    if let Err(e) = fs::remove_file(source).await {
        warn!("Copied audio but could not remove source {}: {}", source.display(), e);
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::FileOperationFailed(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |s| s.eq_ignore_ascii_case(ext))
}
