//! Trip journal storage and recording pipeline
//!
//! Trips live in a directory tree (`Trips/<tripId>/...`) of JSON documents and
//! audio blobs. A [`recording::RecordingCoordinator`] turns one audio capture
//! plus cached location and a public IP lookup into a persisted entry.

pub mod audio;
pub mod config;
pub mod export;
pub mod location;
pub mod network;
pub mod recording;
pub mod storage;

pub use storage::{Entry, LocationSnapshot, StorageError, Trip, TripStorage};
