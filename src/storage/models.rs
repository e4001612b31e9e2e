use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named collection of journal entries, stored as `trip.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One captured journal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub trip_id: Uuid,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub transcript: String,
    #[serde(rename = "publicIP", default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSnapshot>,
    /// Reserved for a rendered map image; nothing writes it yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_snapshot_file_name: Option<String>,
}

impl Entry {
    pub fn new(trip_id: Uuid, transcript: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            created_at: Utc::now(),
            transcript: transcript.into(),
            public_ip: None,
            audio_file_name: None,
            audio_duration_seconds: None,
            location: None,
            map_snapshot_file_name: None,
        }
    }
}

/// Where the device was when an entry was captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placemark_description: Option<String>,
}

/// Pretty JSON with keys in sorted order.
///
/// Going through `serde_json::Value` sorts object keys (its map is ordered),
/// so re-encoding an unmodified value always yields the same bytes.
pub fn to_document<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string_pretty(&value)
}

pub fn from_document<T: for<'de> Deserialize<'de>>(content: &str) -> serde_json::Result<T> {
    serde_json::from_str(content)
}

/// RFC 3339 timestamps in UTC with a fixed nanosecond fraction.
///
/// Reading accepts any RFC 3339 precision or offset.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry() -> Entry {
        let mut entry = Entry::new(Uuid::new_v4(), "Crossed the bridge at dawn");
        entry.public_ip = Some("203.0.113.7".to_string());
        entry.audio_file_name = Some(format!("{}.m4a", entry.id));
        entry.audio_duration_seconds = Some(12.75);
        entry.location = Some(LocationSnapshot {
            latitude: 37.8199,
            longitude: -122.4783,
            horizontal_accuracy: 8.0,
            placemark_description: Some("Golden Gate Bridge, San Francisco".to_string()),
        });
        entry
    }

    #[test]
    fn entry_document_uses_wire_field_names() {
        let entry = sample_entry();
        let doc = to_document(&entry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();

        assert_eq!(value["publicIP"], "203.0.113.7");
        assert_eq!(value["tripId"], entry.trip_id.to_string());
        assert_eq!(value["audioDurationSeconds"], 12.75);
        assert_eq!(value["location"]["horizontalAccuracy"], 8.0);
        assert!(value.get("mapSnapshotFileName").is_none());
    }

    #[test]
    fn keys_are_sorted_and_slashes_unescaped() {
        let mut entry = Entry::new(Uuid::new_v4(), "a/b");
        entry.audio_file_name = Some("x.m4a".to_string());
        let doc = to_document(&entry).unwrap();

        let audio = doc.find("\"audioFileName\"").unwrap();
        let created = doc.find("\"createdAt\"").unwrap();
        let id = doc.find("\"id\"").unwrap();
        let transcript = doc.find("\"transcript\"").unwrap();
        let trip = doc.find("\"tripId\"").unwrap();
        assert!(audio < created && created < id && id < transcript && transcript < trip);
        assert!(doc.contains("\"a/b\""));
        assert!(doc.contains('\n'));
    }

    #[test]
    fn absent_optionals_stay_absent() {
        let entry = Entry::new(Uuid::new_v4(), "no extras");
        let decoded: Entry = from_document(&to_document(&entry).unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert!(decoded.public_ip.is_none());
        assert!(decoded.location.is_none());
    }

    #[test]
    fn reencoding_is_byte_identical() {
        let entry = sample_entry();
        let first = to_document(&entry).unwrap();
        let decoded: Entry = from_document(&first).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(to_document(&decoded).unwrap(), first);

        let trip = Trip::new("Coast Drive");
        let first = to_document(&trip).unwrap();
        let decoded: Trip = from_document(&first).unwrap();
        assert_eq!(decoded, trip);
        assert_eq!(to_document(&decoded).unwrap(), first);
    }

    #[test]
    fn timestamps_have_fixed_precision() {
        let mut trip = Trip::new("t");
        trip.created_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        trip.updated_at = trip.created_at;
        let doc = to_document(&trip).unwrap();
        assert!(doc.contains("\"2024-05-01T09:30:00.000000000Z\""));
    }

    #[test]
    fn reads_timestamps_written_without_fraction() {
        let raw = r#"{
            "createdAt": "2024-05-01T09:30:00Z",
            "id": "6f1c0a4e-2b7d-4f3a-9c10-1d2e3f4a5b6c",
            "title": "Imported",
            "updatedAt": "2024-05-01T11:30:00+02:00"
        }"#;
        let trip: Trip = from_document(raw).unwrap();
        assert_eq!(trip.created_at, trip.updated_at);
    }
}
