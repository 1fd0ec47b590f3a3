//! Pad voice - sustained, atmospheric texture.
//!
//! Pads are the foundation of ambient and atmospheric music. They provide
//! a lush backdrop that fills sonic space without demanding attention.
//!
//! # How It Works
//!
//! 1. Pulse synth (a saw minus a delayed copy of itself) with a narrow width
//!    for a thinner, reedy tone
//! 2. Slow attack for a gradual fade-in
//! 3. High sustain keeps the sound alive while held
//! 4. Long release for a smooth fade-out
//!
//! # Variations
//!
//! - Width towards 0.5 = hollow, square-like
//! - Chain a `Reverb` = wide, washed-out pad

use crate::{
    engine::AudioContext,
    error::Result,
    synth::{PulseSynth, Voice},
};

/// Create a pad voice - lush, sustained texture.
pub fn pad(ctx: &mut AudioContext) -> Result<PulseSynth> {
    let mut synth = PulseSynth::new(ctx, 0.3)?;
    synth.set_adsr(0.3, 0.1, 0.8, 0.5)?;
    synth.amp(ctx, 0.6, 0.0)?;
    Ok(synth)
}
