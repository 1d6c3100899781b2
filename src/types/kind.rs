//! Pulse kind selector.

use std::fmt;
use std::str::FromStr;

use crate::error::DetectionError;

/// Which end of the water column a cold pulse is detected at.
///
/// A bottom pulse shows up as negative stratification (cold water at depth),
/// a top pulse as positive stratification (cold water near the surface).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PulseKind {
    /// Cold anomaly at the shallowest sensor
    Top,
    /// Cold anomaly at the deepest sensor
    #[default]
    Bot,
}

impl PulseKind {
    /// +1 for top pulses, -1 for bottom pulses.
    ///
    /// Multiplying a stratification value by this sign turns every
    /// "is this anomalous" test into a bottom-pulse test.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            PulseKind::Top => 1.0,
            PulseKind::Bot => -1.0,
        }
    }

    /// Short label used in file names and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            PulseKind::Top => "top",
            PulseKind::Bot => "bot",
        }
    }
}

impl fmt::Display for PulseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PulseKind {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(PulseKind::Top),
            "bot" | "bottom" => Ok(PulseKind::Bot),
            other => Err(DetectionError::InvalidConfiguration(format!(
                "unknown pulse kind '{}', expected 'top' or 'bot'",
                other
            ))),
        }
    }
}
