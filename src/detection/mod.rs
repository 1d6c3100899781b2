//! Cold-pulse detection stages.
//!
//! - candidate extraction: initial intervals from φ
//! - filters: duration, drop, specific stratification, bottom-logger
//!   attribution
//! - refinement: moving starts back and ends forward
//! - merging and splitting into pulses and subpulses
//! - [`PulseDetector`]: the driver chaining all of the above
//!
//! Intervals are half-open `[start, end)` sample ranges stored in an
//! [`IntervalSet`].

mod candidates;
mod filters;
mod intervals;
mod merge;
mod pipeline;
mod refine;

pub use candidates::{
    baseline_candidates, intervals_from_edges, reference_is_coldest, threshold_candidates,
};
pub use filters::{
    filter_bottom_logger, filter_drop, filter_duration, filter_specific_tsi,
    is_driven_by_reference, max_drop, specific_tsi,
};
pub use intervals::IntervalSet;
pub use merge::{merge_overlaps, split_pulses, subpulse_boundaries};
pub use pipeline::PulseDetector;
pub use refine::{end_indicator, right_maxima, shift_ends, shift_starts, start_indicator};
