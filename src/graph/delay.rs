use crate::{
    engine::AudioContext,
    error::{check_range, Error, Result},
    graph::{
        effect::{set_param, Effect, EffectCore},
        node::{FilterType, NodeId, ParamId, ParamKind},
    },
};

/// Longest delay time a `Delay` can be set to, in seconds.
pub const MAX_DELAY_TIME: f32 = 5.0;

/*
Feedback Delay
==============

  input ──▶ delay ──▶ lowpass ──┬──▶ wet
              ▲                 │
              └──── feedback ◀──┘

Each repeat passes the lowpass once more, so echoes darken as they fade.
Feedback must stay below 1: at 1 or above every repeat is as loud as the
last and the loop never dies out.
*/

pub struct Delay {
    core: EffectCore,
    delay: NodeId,
    filter: NodeId,
    feedback: NodeId,
}

impl Delay {
    pub fn new(ctx: &mut AudioContext) -> Result<Self> {
        let core = EffectCore::new(ctx, "delay")?;
        let graph = ctx.graph_mut();
        let delay = graph.create_delay(MAX_DELAY_TIME);
        let filter = graph.create_biquad(FilterType::LowPass);
        let feedback = graph.create_gain(0.5);

        graph.connect(core.input(), delay)?;
        graph.connect(delay, filter)?;
        graph.connect(filter, core.wet())?;
        graph.connect(filter, feedback)?;
        graph.connect(feedback, delay)?;
        core.adopt(ctx, [delay, filter, feedback]);

        let mut this = Self {
            core,
            delay,
            filter,
            feedback,
        };
        this.filter(ctx, 1200.0, 0.3)?;
        Ok(this)
    }

    /// Route `source` in and set time, feedback and the lowpass cutoff.
    pub fn process(
        &mut self,
        ctx: &mut AudioContext,
        source: NodeId,
        delay_time: f32,
        feedback: f32,
        lowpass: f32,
    ) -> Result<()> {
        self.process_from(ctx, source)?;
        self.delay_time(ctx, delay_time)?;
        self.feedback(ctx, feedback)?;
        self.filter(ctx, lowpass, 0.3)
    }

    pub fn delay_time(&mut self, ctx: &mut AudioContext, seconds: f32) -> Result<()> {
        check_range("delay time", seconds as f64, 0.0, MAX_DELAY_TIME as f64)?;
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(self.delay, ParamKind::DelayTime), seconds, now)
    }

    pub fn feedback(&mut self, ctx: &mut AudioContext, amount: f32) -> Result<()> {
        if !(amount.is_finite() && (0.0..1.0).contains(&amount)) {
            return Err(Error::OutOfRange {
                name: "feedback",
                min: 0.0,
                max: 1.0,
                value: amount as f64,
            });
        }
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(self.feedback, ParamKind::Gain), amount, now)
    }

    /// Cutoff and resonance of the lowpass in the feedback loop.
    pub fn filter(&mut self, ctx: &mut AudioContext, freq: f32, res: f32) -> Result<()> {
        if !(freq.is_finite() && freq > 0.0) {
            return Err(Error::InvalidFrequency(freq as f64));
        }
        check_range("res", res as f64, 0.0001, 1000.0)?;
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(self.filter, ParamKind::Frequency), freq, now)?;
        set_param(ctx, ParamId::new(self.filter, ParamKind::Q), res, now)
    }

    pub fn delay_time_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.read(ctx, ParamId::new(self.delay, ParamKind::DelayTime), time)
    }

    pub fn feedback_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.read(ctx, ParamId::new(self.feedback, ParamKind::Gain), time)
    }

    pub fn cutoff_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.read(ctx, ParamId::new(self.filter, ParamKind::Frequency), time)
    }

    fn read(&self, ctx: &AudioContext, param: ParamId, time: f64) -> f32 {
        ctx.graph().value_at(param, time).unwrap_or(0.0)
    }
}

impl Effect for Delay {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }
}
