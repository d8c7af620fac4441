//! The three flight tools as plain data-in / data-out operations.
//!
//! Each call fetches a fresh snapshot; nothing is shared between calls.
//! Front-ends call these directly; the agent loop reaches them through the
//! [`ToolRegistry`](super::registry::ToolRegistry).

use std::sync::Arc;

use crate::flight_data::{
    AlertResult, FlightDataError, FlightLookupResult, Snapshot, SnapshotSource,
};

use super::anomaly::AnomalyRules;

/// Flight tools bound to a snapshot source.
#[derive(Clone)]
pub struct FlightTools {
    source: Arc<dyn SnapshotSource>,
    default_region: String,
    rules: AnomalyRules,
}

impl FlightTools {
    pub fn new(source: Arc<dyn SnapshotSource>, default_region: impl Into<String>) -> Self {
        Self {
            source,
            default_region: default_region.into(),
            rules: AnomalyRules::default(),
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    fn region_or_default<'a>(&'a self, region: Option<&'a str>) -> &'a str {
        region.unwrap_or(&self.default_region)
    }

    /// Latest snapshot for a region, unchanged.
    pub async fn region_snapshot(&self, region: Option<&str>) -> Result<Snapshot, FlightDataError> {
        self.source.fetch(self.region_or_default(region)).await
    }

    /// Find a flight by callsign. Not finding one is a valid result.
    pub async fn lookup_callsign(
        &self,
        callsign: &str,
        region: Option<&str>,
    ) -> Result<FlightLookupResult, FlightDataError> {
        let region = self.region_or_default(region);
        let snapshot = self.source.fetch(region).await?;
        let found = snapshot.find_by_callsign(callsign).cloned();

        let message = match found {
            Some(_) => format!("Found flight {callsign} in {region}"),
            None => format!("No flight with callsign '{callsign}' found in {region}"),
        };

        Ok(FlightLookupResult {
            region: snapshot.region,
            snapshot_time: snapshot.snapshot_time,
            fetched_at_iso: snapshot.fetched_at_iso,
            flight: found,
            message,
        })
    }

    /// Flights that trip any anomaly rule.
    pub async fn list_alerts(&self, region: Option<&str>) -> Result<AlertResult, FlightDataError> {
        let snapshot = self.source.fetch(self.region_or_default(region)).await?;
        let result = self.rules.detect(&snapshot);
        tracing::debug!(
            region = %result.region,
            flights = snapshot.flight_count(),
            alerts = result.alert_count,
            "anomaly detection complete"
        );
        Ok(result)
    }
}
