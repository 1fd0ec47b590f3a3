//! Low-level scheduling primitives used by the graph, synth and sequencing
//! layers.
//!
//! Both types here are plain data: sorted event lists with no knowledge of
//! nodes or voices. Higher layers decide what the events mean.

/// Automation curves with set/linear/exponential ramps and read-back.
pub mod automation;
/// Sorted time-indexed event lists (voice occupancy, note assignment, clock state).
pub mod timeline;

pub use automation::{AudioParam, RampShape};
pub use timeline::Timeline;
