use crate::{engine::AudioContext, error::Result, synth::voice::Voice};

/// Factory for creating voices with a specific patch/sound design
///
/// This is the "instrument design" layer - you configure your sound once,
/// then PolySynth uses this factory to fill its pool with identical voices.
/// Voices build their nodes inside the context they will play in.
pub trait VoiceFactory: Send {
    type Voice: Voice;

    fn create_voice(&self, ctx: &mut AudioContext) -> Result<Self::Voice>;
}

impl<F, V> VoiceFactory for F
where
    F: Fn(&mut AudioContext) -> Result<V> + Send,
    V: Voice,
{
    type Voice = V;

    fn create_voice(&self, ctx: &mut AudioContext) -> Result<Self::Voice> {
        self(ctx)
    }
}
