//! Result bundle of a detection run.

use super::records::{PulseRecord, PulseSeries, SubpulseRecord};
use crate::climatology::ThresholdEstimate;
use crate::grid::TemperatureGrid;
use crate::types::{DepthIndex, PulseKind};

/// Everything a detection run produces.
#[derive(Clone, Debug)]
pub struct DetectionOutput {
    /// Pulse kind detected
    pub kind: PulseKind,
    /// Row of the reference depth in `grid`
    pub reference: DepthIndex,
    /// Threshold used for candidate extraction (`None` for the
    /// baseline-anomaly strategy)
    pub threshold: Option<ThresholdEstimate>,
    /// Stratification index φ
    pub phi: Vec<f64>,
    /// Pulse table
    pub pulses: Vec<PulseRecord>,
    /// Subpulse table
    pub subpulses: Vec<SubpulseRecord>,
    /// Annotated series
    pub series: PulseSeries,
    /// Input grid after NaN-column propagation
    pub grid: TemperatureGrid,
}

impl DetectionOutput {
    /// Number of pulses found.
    pub fn n_pulses(&self) -> usize {
        self.pulses.len()
    }

    /// True if no pulse was found.
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Reference depth in metres.
    pub fn reference_depth(&self) -> f64 {
        self.grid.depths()[self.reference.get()]
    }

    /// Summed degree cooling hours over all pulses.
    pub fn total_dch(&self) -> f64 {
        self.pulses.iter().map(|p| p.dch).sum()
    }

    /// Subpulses of one pulse.
    pub fn subpulses_of(&self, pulse_id: usize) -> impl Iterator<Item = &SubpulseRecord> {
        self.subpulses.iter().filter(move |s| s.pulse_id == pulse_id)
    }

    /// One-line summary for logs.
    pub fn summary_line(&self) -> String {
        let threshold = match &self.threshold {
            Some(t) if t.low_confidence => format!("threshold={:.4} (low confidence)", t.value),
            Some(t) => format!("threshold={:.4}", t.value),
            None => "baseline anomaly".to_string(),
        };
        format!(
            "{} pulses ({}), {} subpulses, DCH={:.3} °C·h, {}",
            self.pulses.len(),
            self.kind,
            self.subpulses.len(),
            self.total_dch(),
            threshold
        )
    }
}
