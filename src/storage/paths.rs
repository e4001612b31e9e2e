//! On-disk layout for trips and entries
//!
//! ```text
//! <root>/<tripId>/trip.json
//! <root>/<tripId>/entries/<entryId>.json
//! <root>/<tripId>/entries/<entryId>.m4a
//! ```

use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const TRIP_INDEX_FILE: &str = "trip.json";
pub const ENTRIES_DIR: &str = "entries";
pub const ENTRY_EXTENSION: &str = "json";
pub const AUDIO_EXTENSION: &str = "m4a";

/// Pure mapping from ids to canonical paths. Performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripPaths {
    root: PathBuf,
}

impl TripPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trip_dir(&self, trip_id: &Uuid) -> PathBuf {
        self.root.join(canonical_id(trip_id))
    }

    pub fn entries_dir(&self, trip_id: &Uuid) -> PathBuf {
        self.trip_dir(trip_id).join(ENTRIES_DIR)
    }

    pub fn trip_index_file(&self, trip_id: &Uuid) -> PathBuf {
        self.trip_dir(trip_id).join(TRIP_INDEX_FILE)
    }

    pub fn entry_json_file(&self, trip_id: &Uuid, entry_id: &Uuid) -> PathBuf {
        self.entries_dir(trip_id)
            .join(format!("{}.{}", canonical_id(entry_id), ENTRY_EXTENSION))
    }

    pub fn entry_audio_file(&self, trip_id: &Uuid, entry_id: &Uuid) -> PathBuf {
        self.entries_dir(trip_id).join(audio_file_name(entry_id))
    }
}

/// File name (no directory) of an entry's audio blob
pub fn audio_file_name(entry_id: &Uuid) -> String {
    format!("{}.{}", canonical_id(entry_id), AUDIO_EXTENSION)
}

// Lowercase hyphenated, the same on every call.
fn canonical_id(id: &Uuid) -> String {
    id.hyphenated().to_string()
}
