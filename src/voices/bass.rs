//! Bass voice.
//!
//! A classic bass using a square wave. Square waves have only odd
//! harmonics, giving a hollow, woody character that works well for bass
//! lines.
//!
//! # How It Works
//!
//! 1. Square wave oscillator provides rich, hollow harmonic content
//! 2. Snappy envelope for rhythmic lines
//! 3. Level pulled down a little so low notes don't swamp the mix
//!
//! # Variations
//!
//! - Lowpass `Filter` with a low cutoff = deep, warm bass
//! - Sawtooth instead = brighter, more present bass
//! - Longer attack = swelling bass pad

use crate::{
    engine::AudioContext,
    error::Result,
    graph::node::Waveform,
    synth::{MonoSynth, Voice},
};

/// Create a bass voice.
pub fn bass(ctx: &mut AudioContext) -> Result<MonoSynth> {
    let mut synth = MonoSynth::with_waveform(ctx, Waveform::Square)?;
    synth.set_adsr(0.01, 0.1, 0.7, 0.15)?;
    synth.amp(ctx, 0.8, 0.0)?;
    Ok(synth)
}
