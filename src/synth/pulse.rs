use crate::{
    engine::{registry::SoundId, AudioContext},
    error::{check_range, Result},
    graph::node::{NodeId, ParamId, ParamKind, Waveform},
    sequencing::notes::Note,
    synth::{
        envelope::Envelope,
        voice::{OutputStage, Voice},
    },
};

/*
Pulse Voice
===========

A pulse wave built from two sawtooths: subtract a copy of the saw delayed by
`width` of a period and the difference is a rectangle whose duty cycle is
`width`.

    saw ─────────────────────────────┐
                                     ├──▶ level ──▶ output
    saw ──▶ invert (×-1) ──▶ delay ──┤
                                     │
    dc offset ───────────────────────┘

The delay time depends on the pitch, so every attack rewrites it alongside
the oscillator frequencies. The dc offset recentres the wave as the duty
cycle moves away from one half.
*/

const MAX_DELAY: f32 = 1.0;

pub struct PulseSynth {
    saw: NodeId,
    shifted: NodeId,
    delay: NodeId,
    dc: NodeId,
    stage: OutputStage,
    envelope: Envelope,
    width: f32,
    frequency: f32,
    sound: Option<SoundId>,
}

impl PulseSynth {
    pub fn new(ctx: &mut AudioContext, width: f32) -> Result<Self> {
        let width = check_range("width", width as f64, 0.0, 1.0)? as f32;
        let now = ctx.current_time();
        let stage = OutputStage::new(ctx)?;

        let graph = ctx.graph_mut();
        let saw = graph.create_oscillator(Waveform::Sawtooth);
        let shifted = graph.create_oscillator(Waveform::Sawtooth);
        let invert = graph.create_gain(-1.0);
        let delay = graph.create_delay(MAX_DELAY);
        let dc = graph.create_constant(dc_offset(width));

        graph.connect(saw, stage.level)?;
        graph.connect(shifted, invert)?;
        graph.connect(invert, delay)?;
        graph.connect(delay, stage.level)?;
        graph.connect(dc, stage.level)?;
        for source in [saw, shifted, dc] {
            graph.start(source, now)?;
        }

        let mut envelope = Envelope::new(ctx)?;
        envelope.set_exp(true);
        envelope.set_input(ctx, &[stage.envelope_target()])?;

        let mut nodes = vec![saw, shifted, invert, delay, dc];
        nodes.extend(stage.nodes());
        let sound = ctx.register("pulse_synth", nodes);

        let mut synth = Self {
            saw,
            shifted,
            delay,
            dc,
            stage,
            envelope,
            width,
            frequency: 440.0,
            sound: Some(sound),
        };
        synth.write_width(ctx, now)?;
        Ok(synth)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Duty cycle in 0..=1, applied now.
    pub fn set_width(&mut self, ctx: &mut AudioContext, width: f32) -> Result<()> {
        self.width = check_range("width", width as f64, 0.0, 1.0)? as f32;
        let now = ctx.current_time();
        self.write_width(ctx, now)
    }

    /// Delay time currently scheduled for `time`.
    pub fn delay_time_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        ctx.graph()
            .param(ParamId::new(self.delay, ParamKind::DelayTime))
            .map(|param| param.value_at(time))
            .unwrap_or(0.0)
    }

    fn write_width(&self, ctx: &mut AudioContext, time: f64) -> Result<()> {
        let graph = ctx.graph_mut();
        graph
            .param_mut(ParamId::new(self.delay, ParamKind::DelayTime))?
            .set_value_at_time(self.width / self.frequency, time);
        graph
            .param_mut(ParamId::new(self.dc, ParamKind::Offset))?
            .set_value_at_time(dc_offset(self.width), time);
        Ok(())
    }
}

fn dc_offset(width: f32) -> f32 {
    1.7 * (0.5 - width)
}

impl Voice for PulseSynth {
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

        for osc in [self.saw, self.shifted] {
            ctx.graph_mut()
                .param_mut(ParamId::new(osc, ParamKind::Frequency))?
                .set_value_at_time(freq, t);
        }
        self.frequency = freq;
        self.write_width(ctx, t)?;

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
    fn delay_tracks_pitch_and_width() {
        let mut ctx = AudioContext::default();
        let mut synth = PulseSynth::new(&mut ctx, 0.25).unwrap();

        synth
            .trigger_attack(&mut ctx, Note::Freq(100.0), 0.5, 0.1)
            .unwrap();

        assert!((synth.delay_time_at(&ctx, 0.0) - 0.25 / 440.0).abs() < 1e-6);
        assert!((synth.delay_time_at(&ctx, 0.1) - 0.0025).abs() < 1e-6);
    }

    #[test]
    fn honours_the_same_timing_contract() {
        let mut ctx = AudioContext::default();
        let mut synth = PulseSynth::new(&mut ctx, 0.5).unwrap();
        synth.set_adsr(0.1, 0.1, 0.5, 0.2).unwrap();

        synth
            .play(&mut ctx, Note::Midi(57), 1.0, 0.0, Some(0.4))
            .unwrap();

        assert!((synth.level_at(&ctx, 0.1) - 1.0).abs() < 1e-3);
        assert!(synth.level_at(&ctx, 0.61) < 1e-6);
    }

    #[test]
    fn width_is_validated() {
        let mut ctx = AudioContext::default();
        assert!(PulseSynth::new(&mut ctx, 1.5).is_err());

        let mut synth = PulseSynth::new(&mut ctx, 0.5).unwrap();
        assert!(synth.set_width(&mut ctx, -0.1).is_err());
        assert_eq!(synth.width(), 0.5);
    }
}
