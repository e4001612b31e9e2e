// src/export.rs
//! Markdown logs for a trip, or for a single day of it

use chrono::{Local, NaiveDate};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::storage::{Entry, Result, Trip, TripStorage};

pub struct LogExporter {
    storage: Arc<TripStorage>,
}

impl LogExporter {
    pub fn new(storage: Arc<TripStorage>) -> Self {
        Self { storage }
    }

    /// Writes `<tripDir>/trip.md` and returns its path.
    pub async fn export_trip_markdown(&self, trip_id: &Uuid) -> Result<PathBuf> {
        let trip = self.storage.load_trip(trip_id).await?;
        let entries = self.storage.list_entries(trip_id).await;
        let md = render_markdown(&trip, &entries, "");

        let path = self.storage.paths().trip_dir(trip_id).join("trip.md");
        self.storage.write_text(&path, &md).await?;
        info!("[{}] Exported {} entries to {}", trip_id, entries.len(), path.display());
        Ok(path)
    }

    /// Writes `<tripDir>/<yyyy-MM-dd>.md` with the entries recorded on `day`
    /// (local time).
    pub async fn export_daily_markdown(&self, trip_id: &Uuid, day: NaiveDate) -> Result<PathBuf> {
        let trip = self.storage.load_trip(trip_id).await?;
        let entries: Vec<Entry> = self
            .storage
            .list_entries(trip_id)
            .await
            .into_iter()
            .filter(|entry| local_day(entry) == day)
            .collect();
        let suffix = format!(" - {}", day.format("%b %-d, %Y"));
        let md = render_markdown(&trip, &entries, &suffix);

        let path = self
            .storage
            .paths()
            .trip_dir(trip_id)
            .join(format!("{}.md", day.format("%Y-%m-%d")));
        self.storage.write_text(&path, &md).await?;
        info!("[{}] Exported {} entries for {} to {}", trip_id, entries.len(), day, path.display());
        Ok(path)
    }
}

fn local_day(entry: &Entry) -> NaiveDate {
    entry.created_at.with_timezone(&Local).date_naive()
}

pub fn render_markdown(trip: &Trip, entries: &[Entry], title_suffix: &str) -> String {
    let mut lines = vec![format!("# {}{}", trip.title, title_suffix), String::new()];

    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.created_at);

    for entry in sorted {
        let time = entry.created_at.with_timezone(&Local).format("%H:%M");
        let place = match &entry.location {
            Some(loc) => loc
                .placemark_description
                .clone()
                .unwrap_or_else(|| format!("({:?}, {:?})", loc.latitude, loc.longitude)),
            None => "(0.0, 0.0)".to_string(),
        };
        lines.push(format!("## {} - {}", time, place));
        if let Some(ip) = &entry.public_ip {
            lines.push(format!("IP: {}", ip));
        }
        lines.push(String::new());
        lines.push(entry.transcript.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}
