//! Pre-built voices for common sounds.
//!
//! Each preset is a configured [`Voice`](crate::synth::Voice) with its own
//! waveform and envelope. They have the factory signature, so a preset can be
//! handed straight to a polyphonic synth:
//!
//! ```
//! use saavy_sound::{engine::AudioContext, synth::PolySynth, voices};
//!
//! let mut ctx = AudioContext::default();
//! let mut keys = PolySynth::new(&mut ctx, 4, voices::pluck).unwrap();
//! keys.play(&mut ctx, 60_u8, 0.7, 0.0, Some(0.5)).unwrap();
//! ```

mod bass;
mod lead;
mod pad;
mod pluck;

pub use bass::bass;
pub use lead::lead;
pub use pad::pad;
pub use pluck::pluck;
