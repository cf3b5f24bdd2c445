use serde::{Deserialize, Deserializer, Serialize};

/// Detailed playback status of the single active stream.
///
/// Transitions:
///   Idle -> Loading -> Playing
///   Loading -> Failed | TimedOut
///   Playing -> Idle            (paused via toggle; station stays current)
///   any -> Loading             (new station selected)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Failed,
    TimedOut,
}

impl PlaybackStatus {
    /// Short label for logs and the status line.
    pub fn label(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Failed => "failed",
            PlaybackStatus::TimedOut => "timeout",
        }
    }
}

/// A radio station record from the catalog.
///
/// `stream_url` is the identity key: favorites, history and marker lookups
/// all dedupe on it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Station {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// IANA zone id, when the catalog carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Station {
    /// Returns `(lat, lon)` when both are finite and in range.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude?;
        let lon = self.longitude?;
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some((lat, lon))
    }

    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref().filter(|h| !h.trim().is_empty())
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// "Country - City", or just the country when the city is blank.
    pub fn location_label(&self) -> String {
        if self.city.is_empty() {
            self.country.clone()
        } else {
            format!("{} - {}", self.country, self.city)
        }
    }

    /// Case-insensitive substring match over name, country and city.
    /// `query` must already be trimmed and lowercased.
    pub fn matches_search(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(query)
            || self.country.to_lowercase().contains(query)
            || self.city.to_lowercase().contains(query)
    }
}

/// Accepts a number, a numeric string, or null.  Anything else becomes `None`
/// so one odd record never rejects the whole catalog.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
