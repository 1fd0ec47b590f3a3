use crate::{
    engine::{registry::SoundId, AudioContext},
    error::{check_range, Result},
    graph::node::{NodeId, NodeKind, ParamId, ParamKind, Waveform},
    sequencing::notes::Note,
    synth::{
        envelope::Envelope,
        voice::{OutputStage, Voice},
    },
};

/// One oscillator through an exponential envelope.
///
///   oscillator ──▶ level ──▶ output ──▶ destination
///                              ▲
///                          envelope
pub struct MonoSynth {
    oscillator: NodeId,
    stage: OutputStage,
    envelope: Envelope,
    sound: Option<SoundId>,
}

impl MonoSynth {
    pub fn new(ctx: &mut AudioContext) -> Result<Self> {
        Self::with_waveform(ctx, Waveform::Sine)
    }

    pub fn with_waveform(ctx: &mut AudioContext, waveform: Waveform) -> Result<Self> {
        let now = ctx.current_time();
        let stage = OutputStage::new(ctx)?;

        let oscillator = ctx.graph_mut().create_oscillator(waveform);
        ctx.graph_mut().connect(oscillator, stage.level)?;
        ctx.graph_mut().start(oscillator, now)?;

        let mut envelope = Envelope::new(ctx)?;
        envelope.set_exp(true);
        envelope.set_input(ctx, &[stage.envelope_target()])?;

        let mut nodes = vec![oscillator];
        nodes.extend(stage.nodes());
        let sound = ctx.register("mono_synth", nodes);

        Ok(Self {
            oscillator,
            stage,
            envelope,
            sound: Some(sound),
        })
    }

    pub fn oscillator(&self) -> NodeId {
        self.oscillator
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn set_waveform(&mut self, ctx: &mut AudioContext, waveform: Waveform) -> Result<()> {
        ctx.graph_mut()
            .set_kind(self.oscillator, NodeKind::Oscillator(waveform))
    }
}

impl Voice for MonoSynth {
    fn trigger_attack(
        &mut self,
        ctx: &mut AudioContext,
        note: Note,
        velocity: f32,
        time_from_now: f64,
    ) -> Result<()> {
        let freq = note.frequency()?;
        let velocity = check_range("velocity", velocity as f64, 0.0, 1.0)? as f32;
        let t = ctx.time_from_now(time_from_now)?;

        ctx.graph_mut()
            .param_mut(ParamId::new(self.oscillator, ParamKind::Frequency))?
            .set_value_at_time(freq, t);
        self.envelope.set_range(velocity, 0.0)?;
        self.envelope.trigger_attack(ctx, None, time_from_now)
    }

    fn trigger_release(&mut self, ctx: &mut AudioContext, time_from_now: f64) -> Result<()> {
        self.envelope.trigger_release(ctx, None, time_from_now)
    }

    fn set_adsr(&mut self, attack: f64, decay: f64, sustain: f32, release: f64) -> Result<()> {
        self.envelope.set_adsr(attack, decay, sustain, release)
    }

    fn amp(&mut self, ctx: &mut AudioContext, volume: f32, ramp_time: f64) -> Result<()> {
        self.stage.amp(ctx, volume, ramp_time)
    }

    fn output(&self) -> NodeId {
        self.stage.output
    }

    fn release_time(&self) -> f64 {
        self.envelope.release_time()
    }

    fn level_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.stage.level_at(ctx, time)
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.envelope.dispose(ctx);
        if let Some(sound) = self.sound.take() {
            ctx.release(sound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_sets_pitch_and_opens_gain() {
        let mut ctx = AudioContext::default();
        let mut synth = MonoSynth::new(&mut ctx).unwrap();

        synth
            .trigger_attack(&mut ctx, Note::Midi(69), 0.8, 0.0)
            .unwrap();

        let freq = ctx
            .graph()
            .param(ParamId::new(synth.oscillator(), ParamKind::Frequency))
            .unwrap()
            .value_at(0.0);
        assert!((freq - 440.0).abs() < 1e-3);
        assert!((synth.level_at(&ctx, 0.02) - 0.8).abs() < 1e-3);
    }

    #[test]
    fn play_falls_silent_after_release() {
        let mut ctx = AudioContext::default();
        let mut synth = MonoSynth::new(&mut ctx).unwrap();

        synth
            .play(&mut ctx, Note::Freq(220.0), 1.0, 0.0, Some(0.5))
            .unwrap();

        assert!(synth.level_at(&ctx, 0.1) > 0.0);
        let silent_at = 0.5 + synth.release_time() + 0.01;
        assert!(synth.level_at(&ctx, silent_at) < 1e-6);
    }

    #[test]
    fn amp_scales_the_envelope() {
        let mut ctx = AudioContext::default();
        let mut synth = MonoSynth::new(&mut ctx).unwrap();
        synth.amp(&mut ctx, 0.5, 0.0).unwrap();

        synth
            .trigger_attack(&mut ctx, Note::Midi(60), 1.0, 0.0)
            .unwrap();

        assert!((synth.level_at(&ctx, 0.02) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn rejects_bad_velocity_and_pitch() {
        let mut ctx = AudioContext::default();
        let mut synth = MonoSynth::new(&mut ctx).unwrap();

        assert!(synth
            .trigger_attack(&mut ctx, Note::Midi(60), 1.5, 0.0)
            .is_err());
        assert!(synth
            .trigger_attack(&mut ctx, Note::Freq(-1.0), 0.5, 0.0)
            .is_err());
        assert!(!synth.envelope().was_triggered());
    }

    #[test]
    fn dispose_releases_every_node() {
        let mut ctx = AudioContext::default();
        let before = ctx.graph().len();
        let mut synth = MonoSynth::new(&mut ctx).unwrap();

        synth.dispose(&mut ctx);
        synth.dispose(&mut ctx);

        assert_eq!(ctx.graph().len(), before);
        assert!(ctx.registry().is_empty());
    }
}
