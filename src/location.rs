//! Cached location fixes
//!
//! Position updates arrive out of band; recording only ever reads the most
//! recent fix and never waits for a new one.

use log::debug;
use std::sync::RwLock;

use crate::storage::LocationSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f64,
}

pub trait LocationProvider: Send + Sync {
    fn last_known_fix(&self) -> Option<LocationFix>;
    fn last_placemark_description(&self) -> Option<String>;

    /// Both cached values combined into one entry snapshot.
    fn snapshot(&self) -> Option<LocationSnapshot> {
        self.last_known_fix().map(|fix| LocationSnapshot {
            latitude: fix.latitude,
            longitude: fix.longitude,
            horizontal_accuracy: fix.horizontal_accuracy,
            placemark_description: self.last_placemark_description(),
        })
    }
}

#[derive(Debug, Default)]
pub struct CachedLocation {
    fix: RwLock<Option<LocationFix>>,
    placemark: RwLock<Option<String>>,
}

impl CachedLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_fix(&self, fix: LocationFix) {
        debug!("Location fix {:.5}, {:.5} (±{}m)", fix.latitude, fix.longitude, fix.horizontal_accuracy);
        if let Ok(mut guard) = self.fix.write() {
            *guard = Some(fix);
        }
    }

    pub fn update_placemark(&self, description: Option<String>) {
        if let Ok(mut guard) = self.placemark.write() {
            *guard = description;
        }
    }
}

impl LocationProvider for CachedLocation {
    fn last_known_fix(&self) -> Option<LocationFix> {
        self.fix.read().ok().and_then(|guard| guard.clone())
    }

    fn last_placemark_description(&self) -> Option<String> {
        self.placemark.read().ok().and_then(|guard| guard.clone())
    }
}

/// Parts of a reverse-geocoded place, any of which may be missing
#[derive(Debug, Clone, Default)]
pub struct PlacemarkParts {
    pub name: Option<String>,
    pub locality: Option<String>,
    pub sub_locality: Option<String>,
    pub administrative_area: Option<String>,
    pub country: Option<String>,
}

/// Join the non-empty parts with ", ".
pub fn compose_placemark_description(parts: &PlacemarkParts) -> Option<String> {
    let joined = [
        &parts.name,
        &parts.locality,
        &parts.sub_locality,
        &parts.administrative_area,
        &parts.country,
    ]
    .into_iter()
    .filter_map(|part| part.as_deref())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_none_without_fix() {
        let cache = CachedLocation::new();
        cache.update_placemark(Some("Somewhere".to_string()));
        assert_eq!(cache.snapshot(), None);
    }

    #[test]
    fn snapshot_combines_fix_and_placemark() {
        let cache = CachedLocation::new();
        cache.update_fix(LocationFix {
            latitude: 48.8584,
            longitude: 2.2945,
            horizontal_accuracy: 5.0,
        });
        cache.update_placemark(Some("Eiffel Tower, Paris".to_string()));

        let snap = cache.snapshot().unwrap();
        assert_eq!(snap.latitude, 48.8584);
        assert_eq!(snap.placemark_description.as_deref(), Some("Eiffel Tower, Paris"));
    }

    #[test]
    fn placemark_skips_empty_parts() {
        let parts = PlacemarkParts {
            name: Some("Pier 39".to_string()),
            locality: Some("San Francisco".to_string()),
            sub_locality: Some(String::new()),
            administrative_area: Some("CA".to_string()),
            country: None,
        };
        assert_eq!(
            compose_placemark_description(&parts).as_deref(),
            Some("Pier 39, San Francisco, CA")
        );
        assert_eq!(compose_placemark_description(&PlacemarkParts::default()), None);
    }
}
