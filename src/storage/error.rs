//! Storage error taxonomy

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Result type for storage engine operations
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// A directory under the storage root could not be created
    #[error("Failed to create directory at {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Move/copy/remove failure, or a read that failed before decoding
    #[error("File operation failed: {0}")]
    FileOperationFailed(String),

    /// File is present but its contents are not a valid document
    #[error("Failed to decode JSON at {}: {source}", path.display())]
    DecodingFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization or the atomic write of a document failed
    #[error("Failed to encode JSON to {}: {reason}", path.display())]
    EncodingFailed { path: PathBuf, reason: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::TripNotFound(_) | StorageError::EntryNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_ids_count_as_not_found() {
        assert!(StorageError::TripNotFound(Uuid::new_v4()).is_not_found());
        assert!(StorageError::EntryNotFound(Uuid::new_v4()).is_not_found());
        assert!(!StorageError::FileOperationFailed("disk full".to_string()).is_not_found());

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let corrupt = StorageError::DecodingFailed {
            path: PathBuf::from("trip.json"),
            source,
        };
        assert!(!corrupt.is_not_found());
    }
}
