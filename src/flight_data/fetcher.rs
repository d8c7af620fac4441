//! Snapshot fetcher — retrieves the latest flight snapshot for a region.
//!
//! One outbound GET per call, no caching here (the snapshot source keeps its
//! own cache). The body is validated into a [`Snapshot`] at this boundary:
//! `region`, `fetched_at_iso` and `flight_count` are backfilled, and a flight
//! field of the wrong JSON type is kept raw instead of failing the snapshot.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::config::RegionsConfig;

use super::errors::FlightDataError;
use super::types::{Flight, Snapshot};

// ─── SnapshotSource ─────────────────────────────────────────────────────────

/// Anything that can produce the current snapshot for a region.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, region: &str) -> Result<Snapshot, FlightDataError>;
}

// ─── HttpSnapshotFetcher ────────────────────────────────────────────────────

/// Fetches snapshots from per-region webhook endpoints.
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    http: HttpClient,
    regions: RegionsConfig,
}

impl HttpSnapshotFetcher {
    pub fn new(regions: RegionsConfig) -> Result<Self, FlightDataError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(regions.fetch_timeout_secs))
            .build()
            .map_err(|e| FlightDataError::UpstreamError {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, regions })
    }

    fn endpoint(&self, region: &str) -> Result<&str, FlightDataError> {
        self.regions
            .endpoint(region)
            .ok_or_else(|| FlightDataError::UnknownRegion {
                region: region.to_string(),
                known: self.regions.known_regions(),
            })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotFetcher {
    async fn fetch(&self, region: &str) -> Result<Snapshot, FlightDataError> {
        let url = self.endpoint(region)?.to_string();

        tracing::debug!(region, url = %url, "fetching snapshot");

        let upstream = |reason: String| FlightDataError::UpstreamError {
            url: url.clone(),
            reason,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(region, status = status.as_u16(), "snapshot source returned error status");
            return Err(upstream(format!("HTTP {}", status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| upstream(format!("invalid JSON body: {e}")))?;

        let snapshot = normalize_snapshot(region, body, Utc::now())?;

        tracing::info!(
            region,
            flight_count = snapshot.flight_count(),
            snapshot_time = ?snapshot.snapshot_time,
            "snapshot fetched"
        );

        Ok(snapshot)
    }
}

// ─── Normalization ──────────────────────────────────────────────────────────

/// Validate an upstream body into a [`Snapshot`].
///
/// The body must be an object with a `flights` array of objects, each read
/// with [`Flight::from_json`]. An upstream `region` wins over the requested one; a disagreeing
/// `flight_count` is replaced by the actual number of flights.
pub fn normalize_snapshot(
    region: &str,
    body: Value,
    fetched_at: DateTime<Utc>,
) -> Result<Snapshot, FlightDataError> {
    let malformed = |reason: String| FlightDataError::MalformedSnapshot {
        region: region.to_string(),
        reason,
    };

    let Value::Object(mut obj) = body else {
        return Err(malformed("body is not a JSON object".into()));
    };

    let raw_flights = match obj.remove("flights") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Err(malformed("missing flights array".into())),
        Some(_) => return Err(malformed("flights is not an array".into())),
    };

    let mut flights = Vec::with_capacity(raw_flights.len());
    for (idx, raw) in raw_flights.into_iter().enumerate() {
        let flight = Flight::from_json(raw)
            .map_err(|e| malformed(format!("flight #{idx} is invalid: {e}")))?;
        flights.push(flight);
    }

    let source_region = obj
        .get("region")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .unwrap_or(region)
        .to_string();

    let snapshot_time = obj.get("snapshot_time").and_then(|v| {
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    });

    let fetched_at_iso = obj
        .get("fetched_at_iso")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| fetched_at.to_rfc3339());

    if let Some(reported) = obj.get("flight_count").and_then(Value::as_u64) {
        if reported as usize != flights.len() {
            tracing::warn!(
                region,
                reported,
                actual = flights.len(),
                "upstream flight_count disagrees with flights array; using actual count"
            );
        }
    }

    Ok(Snapshot::new(source_region, snapshot_time, fetched_at_iso, flights))
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_full_body_passes_through() {
        let body = json!({
            "region": "region1",
            "snapshot_time": 1_760_000_000,
            "fetched_at_iso": "2026-10-18T11:59:58Z",
            "flight_count": 1,
            "flights": [{"icao24": "abc123", "callsign": "PIA293 ", "velocity": 210.0}]
        });
        let snap = normalize_snapshot("region1", body, fixed_time()).unwrap();
        assert_eq!(snap.region, "region1");
        assert_eq!(snap.snapshot_time, Some(1_760_000_000));
        assert_eq!(snap.fetched_at_iso, "2026-10-18T11:59:58Z");
        assert_eq!(snap.flight_count(), 1);
        assert_eq!(snap.flights()[0].velocity, Some(210.0));
    }

    #[test]
    fn test_backfills_region_count_and_fetch_time() {
        let body = json!({"flights": [{"icao24": "a"}, {"icao24": "b"}]});
        let snap = normalize_snapshot("region1", body, fixed_time()).unwrap();
        assert_eq!(snap.region, "region1");
        assert_eq!(snap.flight_count(), 2);
        assert_eq!(snap.fetched_at_iso, fixed_time().to_rfc3339());
        assert!(snap.snapshot_time.is_none());
    }

    #[test]
    fn test_wrong_flight_count_is_reconciled() {
        let body = json!({"flight_count": 7, "flights": [{"icao24": "a"}]});
        let snap = normalize_snapshot("region1", body, fixed_time()).unwrap();
        assert_eq!(snap.flight_count(), 1);
    }

    #[test]
    fn test_missing_subfields_stay_unknown() {
        let body = json!({"flights": [{"icao24": "a", "baro_altitude": null}]});
        let snap = normalize_snapshot("region1", body, fixed_time()).unwrap();
        let f = &snap.flights()[0];
        assert!(f.baro_altitude.is_none());
        assert!(f.velocity.is_none());
        assert!(f.callsign.is_none());
    }

    #[test]
    fn test_missing_flights_is_malformed() {
        let err = normalize_snapshot("region1", json!({"region": "region1"}), fixed_time())
            .unwrap_err();
        assert!(matches!(err, FlightDataError::MalformedSnapshot { .. }));
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let err = normalize_snapshot("region1", json!([1, 2]), fixed_time()).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_non_object_flight_is_malformed() {
        let body = json!({"flights": [{"icao24": "a"}, "b"]});
        let err = normalize_snapshot("region1", body, fixed_time()).unwrap_err();
        assert!(err.to_string().contains("flight #1"));
    }

    #[test]
    fn test_mistyped_flight_fields_keep_snapshot_usable() {
        let body = json!({
            "flights": [
                {"icao24": "a", "callsign": "PIA293", "squawk": 7700, "time_position": 1.5},
                {"icao24": "b", "velocity": "fast"}
            ]
        });
        let snap = normalize_snapshot("region1", body, fixed_time()).unwrap();

        assert_eq!(snap.flight_count(), 2);
        let first = snap.find_by_callsign("pia293").unwrap();
        assert!(first.squawk.is_none());
        assert_eq!(first.extra.get("squawk"), Some(&json!(7700)));
        assert_eq!(first.extra.get("time_position"), Some(&json!(1.5)));
        assert!(snap.flights()[1].velocity.is_none());
        assert_eq!(snap.flights()[1].extra.get("velocity"), Some(&json!("fast")));
    }

    #[tokio::test]
    async fn test_unknown_region_makes_no_request() {
        let fetcher = HttpSnapshotFetcher::new(RegionsConfig::default()).unwrap();
        let err = fetcher.fetch("region42").await.unwrap_err();
        assert_eq!(
            err,
            FlightDataError::UnknownRegion {
                region: "region42".into(),
                known: vec!["region1".into()],
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_source_is_upstream_error() {
        let mut regions = RegionsConfig::default();
        regions.fetch_timeout_secs = 2;
        regions
            .endpoints
            .insert("region1".into(), "http://127.0.0.1:9/webhook".into());
        let fetcher = HttpSnapshotFetcher::new(regions).unwrap();
        let err = fetcher.fetch("region1").await.unwrap_err();
        assert!(matches!(err, FlightDataError::UpstreamError { .. }));
    }
}
