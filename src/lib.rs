//! Sample-accurate scheduling for polyphonic synths, step sequencers and
//! effect chains.
//!
//! Nothing here renders audio. Every operation writes timestamped automation
//! into an [`AudioGraph`](graph::AudioGraph) owned by an
//! [`AudioContext`](engine::AudioContext), whose clock the host advances from
//! its audio callback. The curves can be read back at any time, which is
//! what the tests do.

pub mod config; // Engine defaults and tolerances
pub mod dsp; // Timelines and parameter automation
pub mod engine; // Audio clock, node graph, live-object registry
pub mod error;
pub mod graph; // Node graph and effects
pub mod io; // MIDI input
pub mod sequencing; // Clock, notes, parts, phrases, scores
pub mod synth; // Envelopes, voices and polyphony
pub mod voices; // Preset voices

pub use config::{AdsrConfig, EngineConfig};
pub use engine::{AudioContext, TimeBase};
pub use error::{Error, Result};
