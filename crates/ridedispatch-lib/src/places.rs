use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::LatLng;

const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Resolved location: the only thing the engine consumes from geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
}

impl Place {
    pub fn new(lat: f64, lng: f64, formatted_address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            formatted_address: formatted_address.into(),
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Resolves free-text input to a [`Place`].
pub trait Geocoder: Send + Sync {
    fn resolve(&self, query: &str) -> Result<Place>;
}

/// Named place entry in a [`Gazetteer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub name: String,
    pub place: Place,
}

/// Offline geocoder backed by a fixed list of named places.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
}

impl Gazetteer {
    pub fn new(entries: Vec<GazetteerEntry>) -> Self {
        Self { entries }
    }

    /// Landmarks around central New Delhi.
    pub fn new_delhi() -> Self {
        let entries = [
            ("Connaught Place", 28.6315, 77.2167, "Connaught Place, New Delhi, Delhi 110001"),
            ("India Gate", 28.6129, 77.2295, "Kartavya Path, India Gate, New Delhi, Delhi 110001"),
            (
                "Red Fort",
                28.6562,
                77.2410,
                "Netaji Subhash Marg, Chandni Chowk, New Delhi, Delhi 110006",
            ),
            ("Qutub Minar", 28.5245, 77.1855, "Seth Sarai, Mehrauli, New Delhi, Delhi 110030"),
            ("Lotus Temple", 28.5535, 77.2588, "Lotus Temple Rd, Bahapur, New Delhi, Delhi 110019"),
            (
                "Humayun's Tomb",
                28.5933,
                77.2507,
                "Mathura Road, Nizamuddin, New Delhi, Delhi 110013",
            ),
            (
                "New Delhi Railway Station",
                28.6430,
                77.2194,
                "Bhavbhuti Marg, Paharganj, New Delhi, Delhi 110055",
            ),
            ("Kashmere Gate", 28.6675, 77.2282, "Kashmere Gate, Delhi 110006"),
            ("Hauz Khas Village", 28.5535, 77.1940, "Hauz Khas Village, New Delhi, Delhi 110016"),
            ("Indira Gandhi International Airport", 28.5562, 77.1000, "New Delhi, Delhi 110037"),
        ];
        Self::new(
            entries
                .into_iter()
                .map(|(name, lat, lng, address)| GazetteerEntry {
                    name: name.to_string(),
                    place: Place::new(lat, lng, address),
                })
                .collect(),
        )
    }

    /// Up to `limit` entry names similar to `query`, best match first.
    pub fn fuzzy_matches(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = query.to_lowercase();
        let mut scored: Vec<(f64, &str)> = self
            .entries
            .iter()
            .map(|entry| {
                let score = strsim::jaro_winkler(&needle, &entry.name.to_lowercase());
                (score, entry.name.as_str())
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

impl Geocoder for Gazetteer {
    fn resolve(&self, query: &str) -> Result<Place> {
        let trimmed = query.trim();
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(trimmed))
            .map(|entry| entry.place.clone())
            .ok_or_else(|| Error::UnknownPlace {
                query: trimmed.to_string(),
                suggestions: self.fuzzy_matches(trimmed, 3),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        let gazetteer = Gazetteer::new_delhi();
        let place = gazetteer.resolve("  india gate ").unwrap();
        assert_eq!(place.position(), LatLng::new(28.6129, 77.2295));
        assert!(place.formatted_address.contains("India Gate"));
    }

    #[test]
    fn unknown_place_offers_suggestions() {
        let gazetteer = Gazetteer::new_delhi();
        let err = gazetteer.resolve("Qutab Minar").unwrap_err();
        match err {
            Error::UnknownPlace { suggestions, .. } => {
                assert_eq!(suggestions.first().map(String::as_str), Some("Qutub Minar"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unrelated_query_has_no_suggestions() {
        let gazetteer = Gazetteer::new_delhi();
        assert!(gazetteer.fuzzy_matches("zzzzzz", 3).is_empty());
    }
}
