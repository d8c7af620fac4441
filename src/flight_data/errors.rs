//! Flight data error types.

use thiserror::Error;

/// Errors produced while obtaining a region snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightDataError {
    /// The region id has no configured endpoint.
    #[error("Unknown region '{region}'. Known regions: {}", known.join(", "))]
    UnknownRegion { region: String, known: Vec<String> },

    /// Network failure, timeout, or non-2xx status from the snapshot source.
    #[error("upstream error from {url}: {reason}")]
    UpstreamError { url: String, reason: String },

    /// The snapshot source answered, but the body is not a usable snapshot.
    #[error("malformed snapshot for region '{region}': {reason}")]
    MalformedSnapshot { region: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_region_lists_known_regions() {
        let err = FlightDataError::UnknownRegion {
            region: "region9".into(),
            known: vec!["region1".into(), "region2".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown region 'region9'. Known regions: region1, region2"
        );
    }

    #[test]
    fn test_malformed_message_names_region() {
        let err = FlightDataError::MalformedSnapshot {
            region: "region1".into(),
            reason: "missing flights array".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed snapshot for region 'region1': missing flights array"
        );
    }
}
