//! Error type shared by the detection pipeline.

use thiserror::Error;

/// Errors raised by the detection core.
///
/// Empty interval sets are never errors: a run that finds no pulse returns
/// empty tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// Missing, out-of-range or inconsistent configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal consistency check failed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Climatology reference could not be loaded or used
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Not enough depths or timesteps to compute the requested quantity
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

/// Result alias for the detection core.
pub type DetectionResult<T> = Result<T, DetectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_payload() {
        let err = DetectionError::InvalidConfiguration("reference depth 30 m".to_string());
        assert!(err.to_string().contains("30 m"));

        let err = DetectionError::InsufficientData("1 depth".to_string());
        assert!(err.to_string().starts_with("Insufficient data"));
    }
}
