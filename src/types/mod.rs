//! Strongly-typed domain types for safer APIs.
//!
//! - [`DepthIndex`]: row index into the depth axis of a temperature grid,
//!   kept distinct from plain time indices
//! - [`PulseKind`]: which end of the water column a pulse is detected at
//!
//! # Example
//!
//! ```
//! use coldpulse_rs::types::{DepthIndex, PulseKind};
//!
//! let kind: PulseKind = "bot".parse().unwrap();
//! assert_eq!(kind, PulseKind::Bot);
//!
//! let row = DepthIndex::new(2);
//! assert_eq!(row.get(), 2);
//! ```

mod indices;
mod kind;

pub use indices::DepthIndex;
pub use kind::PulseKind;
