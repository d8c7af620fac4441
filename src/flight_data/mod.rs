//! Flight data — snapshot model and the fetcher that produces it.

pub mod errors;
pub mod fetcher;
pub mod types;

pub use errors::FlightDataError;
pub use fetcher::{normalize_snapshot, HttpSnapshotFetcher, SnapshotSource};
pub use types::{
    normalize_callsign, Alert, AlertResult, Flight, FlightLookupResult, FlightSummary, Severity,
    Snapshot,
};
