//! Lead voice.
//!
//! A bright, cutting lead sound using a sawtooth wave. Sawtooth waves
//! contain all harmonics (both odd and even), making them ideal for
//! leads that need to cut through a mix.
//!
//! # How It Works
//!
//! 1. Sawtooth oscillator provides the full harmonic spectrum
//! 2. Short attack and decay, with a high sustain for held notes
//! 3. Moderate release so phrases connect
//!
//! # Variations
//!
//! - Route through a lowpass `Filter` = rounder, less buzzy lead
//! - Shorter decay, no sustain = plucky lead
//! - Chain a `Delay` = spacey lead

use crate::{
    engine::AudioContext,
    error::Result,
    graph::node::Waveform,
    synth::{MonoSynth, Voice},
};

/// Create a lead voice.
pub fn lead(ctx: &mut AudioContext) -> Result<MonoSynth> {
    let mut synth = MonoSynth::with_waveform(ctx, Waveform::Sawtooth)?;
    synth.set_adsr(0.01, 0.1, 0.6, 0.2)?;
    Ok(synth)
}
