use crate::{
    dsp::automation::RampShape,
    engine::AudioContext,
    error::{check_offset, check_range, Result},
    graph::node::{Destination, NodeId, ParamId, ParamKind},
    sequencing::notes::Note,
};

/// One monophonic sound source the allocator can drive.
///
/// The allocator only relies on this capability set, never on how a voice
/// builds its sound. Every voice routes its generator through its envelope
/// into an output gain node; `output()` is what gets connected onwards.
pub trait Voice: Send {
    fn trigger_attack(
        &mut self,
        ctx: &mut AudioContext,
        note: Note,
        velocity: f32,
        time_from_now: f64,
    ) -> Result<()>;

    fn trigger_release(&mut self, ctx: &mut AudioContext, time_from_now: f64) -> Result<()>;

    fn set_adsr(&mut self, attack: f64, decay: f64, sustain: f32, release: f64) -> Result<()>;

    /// Scale the output level, ramping over `ramp_time` seconds.
    fn amp(&mut self, ctx: &mut AudioContext, volume: f32, ramp_time: f64) -> Result<()>;

    fn output(&self) -> NodeId;

    /// Release stage length, used to know when a released voice falls silent.
    fn release_time(&self) -> f64;

    /// Control-rate output level at `time` (envelope included).
    fn level_at(&self, ctx: &AudioContext, time: f64) -> f32;

    fn dispose(&mut self, ctx: &mut AudioContext);

    /// Attack, then release `sustain` seconds later. `None` uses the
    /// context's default sustain.
    fn play(
        &mut self,
        ctx: &mut AudioContext,
        note: Note,
        velocity: f32,
        time_from_now: f64,
        sustain: Option<f64>,
    ) -> Result<()> {
        let sustain = check_offset(sustain.unwrap_or(ctx.config().default_sustain))?;
        self.trigger_attack(ctx, note, velocity, time_from_now)?;
        self.trigger_release(ctx, time_from_now + sustain)
    }

    fn connect(&mut self, ctx: &mut AudioContext, destination: Destination) -> Result<()> {
        ctx.graph_mut().connect(self.output(), destination)
    }

    fn disconnect(&mut self, ctx: &mut AudioContext) {
        ctx.graph_mut().disconnect(self.output());
    }
}

/// The level and envelope gain stages every voice ends in:
///
///   generator ──▶ level (amp) ──▶ output (gain driven by the envelope) ──▶
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputStage {
    pub level: NodeId,
    pub output: NodeId,
}

impl OutputStage {
    pub fn new(ctx: &mut AudioContext) -> Result<Self> {
        let destination = ctx.destination();
        let graph = ctx.graph_mut();
        let level = graph.create_gain(1.0);
        let output = graph.create_gain(0.0);
        graph.connect(level, output)?;
        graph.connect(output, destination)?;
        Ok(Self { level, output })
    }

    /// The parameter the envelope drives.
    pub fn envelope_target(&self) -> Destination {
        ParamId::new(self.output, ParamKind::Gain).into()
    }

    pub fn amp(&self, ctx: &mut AudioContext, volume: f32, ramp_time: f64) -> Result<()> {
        check_range("volume", volume as f64, 0.0, f32::MAX as f64)?;
        let now = ctx.current_time();
        let end = ctx.time_from_now(ramp_time)?;
        let param = ctx
            .graph_mut()
            .param_mut(ParamId::new(self.level, ParamKind::Gain))?;
        param.hold_at(now, RampShape::Linear);
        param.linear_ramp_to_value_at_time(volume, end);
        Ok(())
    }

    pub fn level_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        let graph = ctx.graph();
        let envelope = graph
            .value_at(ParamId::new(self.output, ParamKind::Gain), time)
            .unwrap_or(0.0);
        let level = graph
            .value_at(ParamId::new(self.level, ParamKind::Gain), time)
            .unwrap_or(0.0);
        envelope * level
    }

    pub fn nodes(&self) -> [NodeId; 2] {
        [self.level, self.output]
    }
}
