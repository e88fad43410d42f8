//! Per-collection settings codec
//!
//! The host grants exactly one opaque string slot per collection; every
//! setting the engine keeps must round-trip through it. The encoding is
//! JSON with explicit keys, and the decoder is total: absent, empty or
//! unparseable content yields the documented defaults rather than an
//! error. Missing keys decode to their defaults, which is what keeps the
//! format forward-compatible in the absence of a schema version.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything the engine persists per collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Explicit roll id chosen by the user; always wins over any surrogate.
    #[serde(default)]
    pub roll_id: Option<String>,
    /// Whether a missing roll may be created on publish.
    #[serde(default = "default_create_new")]
    pub create_new: bool,
    /// Name for a newly created roll.
    #[serde(default)]
    pub roll_name: Option<String>,
    /// Date for a newly created roll.
    #[serde(default)]
    pub roll_date: Option<RollDate>,
}

fn default_create_new() -> bool {
    true
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            roll_id: None,
            create_new: true,
            roll_name: None,
            roll_date: None,
        }
    }
}

impl CollectionSettings {
    /// Serialize into the single opaque slot.
    pub fn encode(&self) -> String {
        // A struct of defaults-only fields cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Total decoder: any content that cannot be parsed is treated as an
    /// empty settings record.
    pub fn decode(slot: Option<&str>) -> Self {
        let Some(raw) = slot.filter(|s| !s.trim().is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str(raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Unparseable collection settings, using defaults");
                Self::default()
            }
        }
    }
}

/// A possibly-partial date entered by the user.
///
/// The roll creation path requires all three components; partial dates are
/// representable so the form state survives a round-trip, but they never
/// reach the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollDate {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
}

impl RollDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.year.is_some() && self.month.is_some() && self.day.is_some()
    }

    /// `YYYY-MM-DD`, only for complete dates.
    pub fn to_iso(&self) -> Option<String> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => Some(format!("{y:04}-{m:02}-{d:02}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CollectionSettings::default();
        assert!(settings.roll_id.is_none());
        assert!(settings.create_new);
        assert!(settings.roll_name.is_none());
        assert!(settings.roll_date.is_none());
    }

    #[test]
    fn test_round_trip_full_field_set() {
        let settings = CollectionSettings {
            roll_id: Some("r1".to_string()),
            create_new: false,
            roll_name: Some("Summer".to_string()),
            roll_date: Some(RollDate::new(2024, 7, 1)),
        };
        assert_eq!(
            CollectionSettings::decode(Some(&settings.encode())),
            settings
        );
    }

    #[test]
    fn test_round_trip_absent_optionals() {
        let settings = CollectionSettings::default();
        assert_eq!(
            CollectionSettings::decode(Some(&settings.encode())),
            settings
        );
    }

    #[test]
    fn test_decode_is_total() {
        assert_eq!(CollectionSettings::decode(None), CollectionSettings::default());
        assert_eq!(CollectionSettings::decode(Some("")), CollectionSettings::default());
        assert_eq!(
            CollectionSettings::decode(Some("not json at all")),
            CollectionSettings::default()
        );
    }

    #[test]
    fn test_missing_keys_decode_to_defaults() {
        let settings = CollectionSettings::decode(Some(r#"{"roll_id": "r9"}"#));
        assert_eq!(settings.roll_id.as_deref(), Some("r9"));
        assert!(settings.create_new);
        assert!(settings.roll_date.is_none());
    }

    #[test]
    fn test_partial_date_is_incomplete() {
        let date = RollDate {
            year: Some(2024),
            month: Some(7),
            day: None,
        };
        assert!(!date.is_complete());
        assert!(date.to_iso().is_none());
    }

    #[test]
    fn test_complete_date_formats_iso() {
        assert_eq!(RollDate::new(2024, 7, 1).to_iso().as_deref(), Some("2024-07-01"));
    }
}
