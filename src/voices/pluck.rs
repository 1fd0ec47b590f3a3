//! Pluck voice - percussive, quickly-decaying note.
//!
//! Plucks are short, punchy sounds that work great for melodies, arpeggios,
//! and rhythmic patterns. Think kalimba, harp, or synth pluck.
//!
//! # How It Works
//!
//! 1. Triangle wave for a soft, bell-like tone
//! 2. Near-instant attack for immediate response
//! 3. Decay straight to silence, no sustain
//! 4. Short release for a quick tail

use crate::{
    engine::AudioContext,
    error::Result,
    graph::node::Waveform,
    synth::{MonoSynth, Voice},
};

/// Create a pluck voice - percussive, fast-decaying.
pub fn pluck(ctx: &mut AudioContext) -> Result<MonoSynth> {
    let mut synth = MonoSynth::with_waveform(ctx, Waveform::Triangle)?;
    synth.set_adsr(0.002, 0.15, 0.0, 0.1)?;
    Ok(synth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::Note;

    #[test]
    fn pluck_dies_away_while_held() {
        let mut ctx = AudioContext::default();
        let mut synth = pluck(&mut ctx).unwrap();
        synth.trigger_attack(&mut ctx, Note::Midi(72), 1.0, 0.0).unwrap();

        assert!(synth.level_at(&ctx, 0.002) > 0.9);
        assert!(synth.level_at(&ctx, 0.5) < 1e-3);
    }
}
