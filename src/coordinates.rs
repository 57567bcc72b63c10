use regex::Regex;
use serde_json::{json, Value};

/// Latitude/longitude as written in the source URL (kept as text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub lat: String,
    pub lng: String,
}

impl Coordinates {
    pub fn to_value(&self) -> Value {
        json!({ "lat": self.lat, "lng": self.lng })
    }
}

/// Pulls `@lat,lng` pairs out of map URLs.
pub struct CoordinateParser {
    at_pair: Regex,
    at_pair_with_zoom: Regex,
}

impl CoordinateParser {
    pub fn new() -> Self {
        CoordinateParser {
            at_pair: Regex::new(r"@(-?\d+\.?\d*),(-?\d+\.?\d*)").expect("coordinate pattern"),
            at_pair_with_zoom: Regex::new(r"@(-?\d+\.?\d*),(-?\d+\.?\d*),")
                .expect("coordinate pattern"),
        }
    }

    /// First `@lat,lng` in `text`.
    pub fn parse(&self, text: &str) -> Option<Coordinates> {
        capture(&self.at_pair, text)
    }

    /// Source listings only count a pair followed by a zoom/extra segment.
    pub fn parse_listing(&self, text: &str) -> Option<Coordinates> {
        capture(&self.at_pair_with_zoom, text)
    }

    /// Value stored as the `coordinates` key of a result batch.
    pub fn key_for(&self, payload: &str) -> Value {
        match self.parse(payload) {
            Some(c) => c.to_value(),
            None => Value::String(payload.to_string()),
        }
    }
}

impl Default for CoordinateParser {
    fn default() -> Self {
        Self::new()
    }
}

fn capture(re: &Regex, text: &str) -> Option<Coordinates> {
    let caps = re.captures(text)?;
    Some(Coordinates {
        lat: caps.get(1)?.as_str().to_string(),
        lng: caps.get(2)?.as_str().to_string(),
    })
}
