//! Run diagnostics.
//!
//! - [`ProgressObserver`]: callback invoked at coarse pipeline checkpoints
//! - [`LogProgress`]: observer forwarding to the `log` facade

mod progress;

pub use progress::{LogProgress, ProgressObserver, Stage};
