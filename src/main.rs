// src/main.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use travel_journal::audio::StagedFileCapture;
use travel_journal::config::{Config, DEFAULT_CONFIG_FILE};
use travel_journal::export::LogExporter;
use travel_journal::location::{CachedLocation, LocationFix};
use travel_journal::network::IpInfoClient;
use travel_journal::recording::RecordingCoordinator;
use travel_journal::storage::TripStorage;

#[derive(Parser)]
#[command(name = "travel-journal")]
#[command(about = "A travel journal of spoken entries, organised by trip")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all trips
    Trips,
    /// Create a new trip
    CreateTrip {
        #[arg(short, long)]
        title: String,
    },
    /// Rename a trip
    RenameTrip {
        #[arg(short, long)]
        id: Uuid,
        #[arg(short, long)]
        title: String,
    },
    /// Show details of a specific trip
    ShowTrip {
        #[arg(short, long)]
        id: Uuid,
    },
    /// Delete a trip and all of its entries
    DeleteTrip {
        #[arg(short, long)]
        id: Uuid,
    },
    /// List the entries of a trip
    Entries {
        #[arg(short, long)]
        trip: Uuid,
    },
    /// Show details of a specific entry
    ShowEntry {
        #[arg(short, long)]
        trip: Uuid,
        #[arg(short, long)]
        id: Uuid,
    },
    /// Add an entry without running a recording session
    AddEntry {
        #[arg(short, long)]
        trip: Uuid,
        #[arg(long)]
        transcript: String,
        #[arg(short, long)]
        audio: Option<PathBuf>,
    },
    /// Delete a specific entry
    DeleteEntry {
        #[arg(short, long)]
        trip: Uuid,
        #[arg(short, long)]
        id: Uuid,
    },
    /// Record an entry with location and public IP metadata
    Record {
        #[arg(short, long)]
        trip: Uuid,
        #[arg(long)]
        transcript: String,
        /// Use an existing recording instead of waiting for one
        #[arg(short, long)]
        audio: Option<PathBuf>,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        #[arg(long, default_value = "10.0")]
        accuracy: f64,
        #[arg(long)]
        place: Option<String>,
    },
    /// Write the current configuration to config.toml
    Config {
        /// Replace an existing config.toml
        #[arg(short, long)]
        force: bool,
    },
    /// Export a trip (or one day of it) as Markdown
    Export {
        #[arg(short, long)]
        trip: Uuid,
        /// Day in YYYY-MM-DD form
        #[arg(short, long)]
        day: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::new()
        .filter_level(config.log_level()?)
        .init();

    let cli = Cli::parse();

    if let Commands::Config { force } = cli.command {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() && !force {
            warn!("{} already exists; pass --force to replace it.", path.display());
        } else {
            config.save_to_file(path)?;
            info!("Wrote configuration to {}", path.display());
        }
        return Ok(());
    }

    let storage = Arc::new(TripStorage::with_base_directory(&config.storage.base_directory).await?);

    match cli.command {
        Commands::Trips => {
            for trip in storage.list_trips().await {
                info!("Trip ID: {}, Title: {}, Created: {}, Updated: {}", trip.id, trip.title, trip.created_at, trip.updated_at);
            }
        }
        Commands::CreateTrip { title } => {
            let trip = storage.create_trip(&title).await?;
            info!("Created trip {} ({})", trip.id, trip.title);
        }
        Commands::RenameTrip { id, title } => {
            let trip = storage.rename_trip(&id, &title).await?;
            info!("Trip {} is now \"{}\"", trip.id, trip.title);
        }
        Commands::ShowTrip { id } => match storage.load_trip(&id).await {
            Ok(trip) => info!("Trip: {:#?}", trip),
            Err(e) if e.is_not_found() => warn!("Trip with ID {} not found.", id),
            Err(e) => return Err(e.into()),
        },
        Commands::DeleteTrip { id } => {
            storage.delete_trip(&id).await?;
            info!("Trip {} deleted.", id);
        }
        Commands::Entries { trip } => {
            for entry in storage.list_entries(&trip).await {
                info!(
                    "Entry ID: {}, Created: {}, Transcript: {}",
                    entry.id, entry.created_at, entry.transcript
                );
            }
        }
        Commands::ShowEntry { trip, id } => match storage.load_entry(&trip, &id).await {
            Ok(entry) => {
                info!("Entry: {:#?}", entry);
                if let Some(audio) = storage.audio_path(&entry) {
                    info!("Audio: {}", audio.display());
                }
            }
            Err(e) if e.is_not_found() => warn!("Entry with ID {} not found in trip {}.", id, trip),
            Err(e) => return Err(e.into()),
        },
        Commands::AddEntry { trip, transcript, audio } => {
            let entry = storage.save_entry(&trip, &transcript, audio.as_deref()).await?;
            info!("Saved entry {}", entry.id);
        }
        Commands::DeleteEntry { trip, id } => {
            storage.delete_entry(&trip, &id).await?;
            info!("Entry {} deleted.", id);
        }
        Commands::Record { trip, transcript, audio, lat, lon, accuracy, place } => {
            let location = Arc::new(CachedLocation::new());
            if let (Some(latitude), Some(longitude)) = (lat, lon) {
                location.update_fix(LocationFix {
                    latitude,
                    longitude,
                    horizontal_accuracy: accuracy,
                });
            }
            location.update_placemark(place);

            let ip = Arc::new(IpInfoClient::new(&config.network.ip_lookup_url, config.ip_timeout())?);
            let recorder = RecordingCoordinator::new(
                storage.clone(),
                Arc::new(StagedFileCapture::in_temp_dir()),
                location,
                ip,
            )
            .with_ip_timeout(config.ip_timeout());

            let handle = recorder.begin_session(&trip).await?;
            match audio {
                Some(source) => {
                    tokio::fs::copy(&source, &handle.path).await?;
                }
                None => {
                    info!("Recording to {}. Press Enter to stop.", handle.path.display());
                    let mut line = String::new();
                    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
                }
            }

            let entry = recorder.end_session(&transcript).await?;
            if entry.audio_file_name.is_none() {
                warn!("Entry {} was saved without audio", entry.id);
            }
            info!("Entry: {:#?}", entry);
        }
        Commands::Config { .. } => {}
        Commands::Export { trip, day } => {
            let exporter = LogExporter::new(storage.clone());
            let path = match day {
                Some(day) => exporter.export_daily_markdown(&trip, day).await?,
                None => exporter.export_trip_markdown(&trip).await?,
            };
            info!("Exported to {}", path.display());
        }
    }

    Ok(())
}
