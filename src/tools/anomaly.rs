//! Threshold heuristics that flag unusual flight behavior.
//!
//! Advisory only. Each rule is evaluated independently on instantaneous
//! data; a missing reading counts as 0 (nominal), not as a data-quality signal.

use serde::{Deserialize, Serialize};

use crate::flight_data::{Alert, AlertResult, Flight, Severity, Snapshot};

pub const LOW_SPEED_AT_ALTITUDE: &str = "Unusually low speed at high altitude";
pub const HIGH_DESCENT_RATE: &str = "Very high descent rate";
pub const HIGH_CLIMB_RATE: &str = "Very high climb rate";

/// Rule thresholds. All units SI (meters, m/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRules {
    /// Above this altitude a flight is considered at cruise.
    pub high_altitude_m: f64,
    /// Below this speed a cruising flight is flagged.
    pub min_cruise_speed_mps: f64,
    /// Climb or descent faster than this is flagged.
    pub max_vertical_rate_mps: f64,
}

impl Default for AnomalyRules {
    fn default() -> Self {
        Self {
            high_altitude_m: 8000.0,
            min_cruise_speed_mps: 100.0,
            max_vertical_rate_mps: 20.0,
        }
    }
}

impl AnomalyRules {
    /// Evaluate every rule against one flight.
    ///
    /// Returns `None` when no rule fires. Severity starts at `Info` and is
    /// raised to `Warning` by any rule, so an emitted alert is always a
    /// warning.
    pub fn evaluate(&self, flight: &Flight) -> Option<Alert> {
        let velocity = flight.velocity.unwrap_or(0.0);
        let altitude = flight.altitude().unwrap_or(0.0);
        let vertical_rate = flight.vertical_rate.unwrap_or(0.0);

        let mut reasons: Vec<&str> = Vec::new();
        let mut severity = Severity::Info;

        if altitude > self.high_altitude_m && velocity < self.min_cruise_speed_mps {
            reasons.push(LOW_SPEED_AT_ALTITUDE);
            severity = Severity::Warning;
        }

        // Descent and climb are mutually exclusive per flight.
        if vertical_rate < -self.max_vertical_rate_mps {
            reasons.push(HIGH_DESCENT_RATE);
            severity = Severity::Warning;
        } else if vertical_rate > self.max_vertical_rate_mps {
            reasons.push(HIGH_CLIMB_RATE);
            severity = Severity::Warning;
        }

        if reasons.is_empty() {
            return None;
        }

        Some(Alert {
            flight: flight.clone(),
            reason: reasons.join("; "),
            severity,
        })
    }

    /// Run the rules over a snapshot, keeping snapshot order.
    pub fn detect(&self, snapshot: &Snapshot) -> AlertResult {
        let alerts: Vec<Alert> = snapshot
            .flights()
            .iter()
            .filter_map(|f| self.evaluate(f))
            .collect();

        AlertResult {
            region: snapshot.region.clone(),
            snapshot_time: snapshot.snapshot_time,
            fetched_at_iso: snapshot.fetched_at_iso.clone(),
            alert_count: alerts.len(),
            alerts,
        }
    }
}
