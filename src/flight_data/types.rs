//! Flight snapshot data model.
//!
//! All observation fields are optional: absence means "unknown", never zero.
//! Optional fields are omitted on serialization so tool results passed to the
//! model keep the same shape the snapshot source produced.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Flight ─────────────────────────────────────────────────────────────────

/// A point-in-time observation of one aircraft (an ADS-B state vector).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flight {
    /// ICAO 24-bit transponder address, hex encoded.
    pub icao24: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
    /// Epoch seconds of the last position update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_position: Option<i64>,
    /// Epoch seconds of the last message of any kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Barometric altitude, meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baro_altitude: Option<f64>,
    /// Geometric altitude, meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_ground: Option<bool>,
    /// Ground speed, m/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    /// Heading, degrees clockwise from north.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_track: Option<f64>,
    /// Vertical rate, m/s. Negative is descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squawk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spi: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_source: Option<i64>,
    /// Fields this model does not know about, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// JSON shape a typed [`Flight`] field accepts. `null` is always accepted.
#[derive(Clone, Copy)]
enum FieldShape {
    Text,
    Integer,
    Number,
    Flag,
}

impl FieldShape {
    fn accepts(self, value: &Value) -> bool {
        value.is_null()
            || match self {
                FieldShape::Text => value.is_string(),
                FieldShape::Integer => value.is_i64(),
                FieldShape::Number => value.is_number(),
                FieldShape::Flag => value.is_boolean(),
            }
    }
}

const TYPED_FIELDS: &[(&str, FieldShape)] = &[
    ("callsign", FieldShape::Text),
    ("origin_country", FieldShape::Text),
    ("time_position", FieldShape::Integer),
    ("last_contact", FieldShape::Integer),
    ("longitude", FieldShape::Number),
    ("latitude", FieldShape::Number),
    ("baro_altitude", FieldShape::Number),
    ("geo_altitude", FieldShape::Number),
    ("on_ground", FieldShape::Flag),
    ("velocity", FieldShape::Number),
    ("true_track", FieldShape::Number),
    ("vertical_rate", FieldShape::Number),
    ("squawk", FieldShape::Text),
    ("spi", FieldShape::Flag),
    ("position_source", FieldShape::Integer),
];

impl Flight {
    /// Parse one upstream flight object without rejecting it over a field type.
    ///
    /// A typed field holding an unexpected JSON type reads as unknown, and its
    /// raw value moves to `extra` under the same key so it still serializes
    /// back out. A non-string `icao24` is stringified.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let Value::Object(mut obj) = value else {
            return Err("not a JSON object".into());
        };

        match obj.get("icao24") {
            None | Some(Value::String(_)) => {}
            Some(Value::Null) => {
                obj.remove("icao24");
            }
            Some(other) => {
                let text = other.to_string();
                obj.insert("icao24".into(), Value::String(text));
            }
        }

        let mut displaced = Map::new();
        for (key, shape) in TYPED_FIELDS {
            let mismatched = obj.get(*key).is_some_and(|v| !shape.accepts(v));
            if mismatched {
                if let Some(raw) = obj.remove(*key) {
                    displaced.insert((*key).to_string(), raw);
                }
            }
        }

        let mut flight: Flight =
            serde_json::from_value(Value::Object(obj)).map_err(|e| e.to_string())?;
        flight.extra.extend(displaced);
        Ok(flight)
    }

    /// Best known altitude: geometric, then barometric.
    ///
    /// A geometric altitude of exactly zero falls through to barometric, the
    /// same way the snapshot source's own consumers treat it.
    pub fn altitude(&self) -> Option<f64> {
        self.geo_altitude
            .filter(|alt| *alt != 0.0)
            .or(self.baro_altitude)
            .or(self.geo_altitude)
    }

    /// Callsign with surrounding whitespace removed (upstream pads to 8 chars).
    pub fn trimmed_callsign(&self) -> Option<&str> {
        self.callsign.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Whether this flight's callsign matches an already-normalized query.
    pub fn matches_callsign(&self, normalized_query: &str) -> bool {
        let stored = normalize_callsign(self.callsign.as_deref().unwrap_or_default());
        stored == normalized_query
    }
}

/// Normalize a callsign for comparison: trim, then upper-case.
pub fn normalize_callsign(callsign: &str) -> String {
    callsign.trim().to_uppercase()
}

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// A region's flight set at one fetch instant.
///
/// Built only through [`Snapshot::new`], which keeps `flight_count` equal to
/// the number of flights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub region: String,
    /// Epoch seconds of the underlying data, if the source reported it.
    pub snapshot_time: Option<i64>,
    /// When the snapshot was retrieved (RFC 3339).
    pub fetched_at_iso: String,
    flight_count: usize,
    flights: Vec<Flight>,
}

impl Snapshot {
    pub fn new(
        region: impl Into<String>,
        snapshot_time: Option<i64>,
        fetched_at_iso: impl Into<String>,
        flights: Vec<Flight>,
    ) -> Self {
        Self {
            region: region.into(),
            snapshot_time,
            fetched_at_iso: fetched_at_iso.into(),
            flight_count: flights.len(),
            flights,
        }
    }

    pub fn flight_count(&self) -> usize {
        self.flight_count
    }

    /// Flights in source order.
    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// First flight whose callsign matches, in snapshot order.
    pub fn find_by_callsign(&self, callsign: &str) -> Option<&Flight> {
        let target = normalize_callsign(callsign);
        self.flights.iter().find(|f| f.matches_callsign(&target))
    }
}

// ─── Tool result shapes ─────────────────────────────────────────────────────

/// Result of a callsign lookup. `flight: None` is a valid "not found".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightLookupResult {
    pub region: String,
    pub snapshot_time: Option<i64>,
    pub fetched_at_iso: String,
    pub flight: Option<Flight>,
    pub message: String,
}

/// Advisory level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One flagged flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub flight: Flight,
    /// Triggered rule descriptions joined with `"; "`.
    pub reason: String,
    pub severity: Severity,
}

/// Result of anomaly detection over one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertResult {
    pub region: String,
    pub snapshot_time: Option<i64>,
    pub fetched_at_iso: String,
    pub alert_count: usize,
    pub alerts: Vec<Alert>,
}

// ─── Table rows ─────────────────────────────────────────────────────────────

/// Flattened flight row for tabular display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSummary {
    pub callsign: String,
    pub icao24: String,
    pub country: Option<String>,
    pub altitude_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub vertical_rate: Option<f64>,
    pub on_ground: Option<bool>,
}

impl From<&Flight> for FlightSummary {
    fn from(f: &Flight) -> Self {
        Self {
            callsign: f.trimmed_callsign().unwrap_or_default().to_string(),
            icao24: f.icao24.clone(),
            country: f.origin_country.clone(),
            altitude_m: f.altitude(),
            speed_mps: f.velocity,
            vertical_rate: f.vertical_rate,
            on_ground: f.on_ground,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
