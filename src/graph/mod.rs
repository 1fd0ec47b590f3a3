//! The audio node graph and the effects built on it.
//!
//! `node` is the in-process model of the audio engine: opaque node handles,
//! edges and parameter automation. Everything else here is an effect, a
//! small bundle of nodes wired behind the shared [`effect::EffectCore`].

/// Dynamics compressor.
pub mod compressor;
/// Feedback delay with a lowpass in the loop.
pub mod delay;
/// Waveshaper distortion.
pub mod distortion;
/// Shared effect wiring, the `Effect` trait and chaining.
pub mod effect;
/// 3- or 8-band peaking equaliser.
pub mod eq;
/// Biquad filter.
pub mod filter;
/// Node arena, parameters and connections.
pub mod node;
/// Convolution reverb with a generated impulse.
pub mod reverb;

pub use compressor::{Compressor, CompressorSettings};
pub use delay::Delay;
pub use distortion::Distortion;
pub use effect::{Effect, EffectCore};
pub use eq::{EqBand, Equalizer};
pub use filter::Filter;
pub use node::{
    AudioGraph, Destination, FilterType, Impulse, NodeId, NodeKind, Oversample, ParamId,
    ParamKind, Waveform,
};
pub use reverb::Reverb;
