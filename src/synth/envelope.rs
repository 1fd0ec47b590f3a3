use tracing::trace;

use crate::{
    dsp::automation::{AudioParam, RampShape},
    engine::{registry::SoundId, AudioContext},
    error::{check_offset, Error, Result},
    graph::node::{Destination, NodeId, ParamId, ParamKind},
};

/*
Scheduled ADSR Envelope
=======================

Unlike a per-sample envelope generator, this envelope never runs. Each call
writes a handful of timestamped ramps into an automation curve and returns;
the audio engine plays the curve back later.

The curve lives on a constant-source "control" node owned by the envelope.
Connecting the envelope to a target (a gain's level, a filter's cutoff) wires
that control node into it, so one envelope can drive several targets at once.

  Level
   aL ┤     ●
      │    ╱ ╲
   dL ┤   ╱   ●───────────●
      │  ╱                 ╲
   rL ┼─●                   ●──
        T   T+a  T+a+d    R   R+r       time
        attack decay sustain release

Retriggering
------------

Every stage begins with an anchor: read the curve's value at the stage start,
cancel everything scheduled after that point, and write the value back.
A release that lands halfway up an attack ramp therefore starts from wherever
the attack actually is at that moment, and the rest of the stale attack/decay
is discarded. No jump, no click.

A stage of length zero is written as a jump at its start time rather than a
ramp, so it never reaches back into the segment before it.

Release is guarded: an envelope that was never attacked (or was already
released) ignores `trigger_release`. Calling it twice is harmless.

Exponential mode
----------------

Exponential ramps cannot touch zero, so in exponential mode every level is
floored at a small epsilon (`EngineConfig::exp_epsilon`) before it is written.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug)]
pub struct Envelope {
    attack_time: f64,
    attack_level: f32,
    decay_time: f64,
    decay_level: f32,
    sustain_ratio: f32,
    release_time: f64,
    release_level: f32,

    exponential: bool,
    epsilon: f32,

    was_triggered: bool,
    last_attack: Option<f64>,
    last_release: Option<f64>,

    control: Option<NodeId>,
    connection: Option<Destination>,
    sound: Option<SoundId>,
}

impl Envelope {
    /// Create an envelope using the context's default ADSR and a 1 → 0 range.
    pub fn new(ctx: &mut AudioContext) -> Result<Self> {
        let adsr = ctx.config().adsr;
        let epsilon = ctx.config().exp_epsilon;
        let now = ctx.current_time();

        let control = ctx.graph_mut().create_constant(0.0);
        ctx.graph_mut().start(control, now)?;
        let sound = ctx.register("envelope", vec![control]);

        let mut env = Self {
            attack_time: adsr.attack,
            attack_level: 1.0,
            decay_time: adsr.decay,
            decay_level: 0.0,
            sustain_ratio: adsr.sustain,
            release_time: adsr.release,
            release_level: 0.0,
            exponential: false,
            epsilon,
            was_triggered: false,
            last_attack: None,
            last_release: None,
            control: Some(control),
            connection: None,
            sound: Some(sound),
        };
        env.update_decay_level();
        Ok(env)
    }

    /// Set all three (time, level) pairs directly.
    pub fn set(
        &mut self,
        attack_time: f64,
        attack_level: f32,
        decay_time: f64,
        decay_level: f32,
        release_time: f64,
        release_level: f32,
    ) -> Result<()> {
        check_stage_time(attack_time)?;
        check_stage_time(decay_time)?;
        check_stage_time(release_time)?;
        for level in [attack_level, decay_level, release_level] {
            if !level.is_finite() {
                return Err(Error::InvalidEnvelope("levels must be finite"));
            }
        }

        self.attack_time = attack_time;
        self.attack_level = attack_level;
        self.decay_time = decay_time;
        self.decay_level = decay_level;
        self.release_time = release_time;
        self.release_level = release_level;

        let span = attack_level - release_level;
        if span != 0.0 {
            self.sustain_ratio = (decay_level - release_level) / span;
        }
        Ok(())
    }

    /// Times in seconds; `sustain` is a ratio of the attack level (0..=1).
    pub fn set_adsr(&mut self, attack: f64, decay: f64, sustain: f32, release: f64) -> Result<()> {
        check_stage_time(attack)?;
        check_stage_time(decay)?;
        check_stage_time(release)?;
        if !(sustain.is_finite() && (0.0..=1.0).contains(&sustain)) {
            return Err(Error::InvalidEnvelope("sustain must be within 0..=1"));
        }

        self.attack_time = attack;
        self.decay_time = decay;
        self.sustain_ratio = sustain;
        self.release_time = release;
        self.update_decay_level();
        Ok(())
    }

    /// Peak and resting levels. The decay (sustain) level follows.
    pub fn set_range(&mut self, attack_level: f32, release_level: f32) -> Result<()> {
        if !(attack_level.is_finite() && release_level.is_finite()) {
            return Err(Error::InvalidEnvelope("levels must be finite"));
        }
        self.attack_level = attack_level;
        self.release_level = release_level;
        self.update_decay_level();
        Ok(())
    }

    pub fn set_exp(&mut self, exponential: bool) {
        self.exponential = exponential;
    }

    pub fn is_exponential(&self) -> bool {
        self.exponential
    }

    pub fn attack_time(&self) -> f64 {
        self.attack_time
    }

    pub fn decay_time(&self) -> f64 {
        self.decay_time
    }

    pub fn release_time(&self) -> f64 {
        self.release_time
    }

    pub fn attack_level(&self) -> f32 {
        self.attack_level
    }

    pub fn decay_level(&self) -> f32 {
        self.decay_level
    }

    pub fn sustain_ratio(&self) -> f32 {
        self.sustain_ratio
    }

    pub fn release_level(&self) -> f32 {
        self.release_level
    }

    pub fn was_triggered(&self) -> bool {
        self.was_triggered
    }

    pub fn connection(&self) -> Option<Destination> {
        self.connection
    }

    /// The constant-source node carrying the curve.
    pub fn control(&self) -> Option<NodeId> {
        self.control
    }

    /// Point the envelope at a new target. Earlier targets stay wired; use
    /// [`disconnect`](Self::disconnect) to drop them.
    pub fn connect(&mut self, ctx: &mut AudioContext, target: Destination) -> Result<()> {
        let control = self.control.ok_or(Error::NodeGone)?;
        if let Destination::Param(param) = target {
            let now = ctx.current_time();
            ctx.graph_mut().param_mut(param)?.set_value_at_time(0.0, now);
        }
        ctx.graph_mut().connect(control, target)?;
        self.connection = Some(target);
        Ok(())
    }

    /// Fan the envelope out to several targets.
    pub fn set_input(&mut self, ctx: &mut AudioContext, targets: &[Destination]) -> Result<()> {
        for target in targets {
            self.connect(ctx, *target)?;
        }
        Ok(())
    }

    pub fn disconnect(&mut self, ctx: &mut AudioContext) {
        if let Some(control) = self.control {
            ctx.graph_mut().disconnect(control);
        }
        self.connection = None;
    }

    pub fn trigger_attack(
        &mut self,
        ctx: &mut AudioContext,
        target: Option<Destination>,
        time_from_now: f64,
    ) -> Result<()> {
        let start = ctx.time_from_now(time_from_now)?;
        self.retarget(ctx, target)?;

        let param = self.control_param(ctx)?;
        self.anchor(param, start)?;
        let t = self.write_stage(param, self.attack_level, start, self.attack_time)?;
        self.write_stage(param, self.decay_level, t, self.decay_time)?;

        self.was_triggered = true;
        self.last_attack = Some(start);
        self.last_release = None;
        trace!(time = start, "envelope attack");
        Ok(())
    }

    /// Release from whatever level the curve has at the release time. A
    /// no-op unless an attack is outstanding.
    pub fn trigger_release(
        &mut self,
        ctx: &mut AudioContext,
        target: Option<Destination>,
        time_from_now: f64,
    ) -> Result<()> {
        let start = ctx.time_from_now(time_from_now)?;
        if !self.was_triggered {
            return Ok(());
        }
        self.retarget(ctx, target)?;

        let param = self.control_param(ctx)?;
        self.anchor(param, start)?;
        self.write_stage(param, self.release_level, start, self.release_time)?;

        self.was_triggered = false;
        self.last_release = Some(start);
        trace!(time = start, "envelope release");
        Ok(())
    }

    /// Attack now (plus offset), release after attack + decay + `sustain_time`.
    pub fn play(
        &mut self,
        ctx: &mut AudioContext,
        target: Option<Destination>,
        time_from_now: f64,
        sustain_time: f64,
    ) -> Result<()> {
        let sustain_time = check_offset(sustain_time)?;
        self.trigger_attack(ctx, target, time_from_now)?;
        self.trigger_release(
            ctx,
            None,
            time_from_now + self.attack_time + self.decay_time + sustain_time,
        )
    }

    /// Glide to `first`, then optionally on to `second`. Rising segments take
    /// the attack time, falling ones the decay time.
    pub fn ramp(
        &mut self,
        ctx: &mut AudioContext,
        target: Option<Destination>,
        time_from_now: f64,
        first: f32,
        second: Option<f32>,
    ) -> Result<()> {
        let mut t = ctx.time_from_now(time_from_now)?;
        self.retarget(ctx, target)?;

        let param = self.control_param(ctx)?;
        let mut current = self.floor(param.value_at(t));
        self.anchor(param, t)?;

        for level in std::iter::once(first).chain(second) {
            let level = self.floor(level);
            if level > current {
                t += self.attack_time;
            } else if level < current {
                t += self.decay_time;
            } else {
                continue;
            }
            self.write_ramp(param, level, t)?;
            current = level;
        }
        Ok(())
    }

    /// The curve's value at `time`.
    pub fn level_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.control
            .and_then(|control| {
                ctx.graph()
                    .param(ParamId::new(control, ParamKind::Offset))
                    .ok()
            })
            .map(|param| param.value_at(time))
            .unwrap_or(0.0)
    }

    pub fn stage_at(&self, time: f64) -> EnvelopeStage {
        let Some(attack) = self.last_attack else {
            return EnvelopeStage::Idle;
        };

        if let Some(release) = self.last_release {
            if time >= release {
                return if time < release + self.release_time {
                    EnvelopeStage::Release
                } else {
                    EnvelopeStage::Idle
                };
            }
        }

        let elapsed = time - attack;
        if elapsed < 0.0 {
            EnvelopeStage::Idle
        } else if elapsed < self.attack_time {
            EnvelopeStage::Attack
        } else if elapsed < self.attack_time + self.decay_time {
            EnvelopeStage::Decay
        } else {
            EnvelopeStage::Sustain
        }
    }

    /// Cancel all pending automation and release the control node. Safe to
    /// call more than once.
    pub fn dispose(&mut self, ctx: &mut AudioContext) {
        if let Some(control) = self.control.take() {
            if let Ok(param) = ctx
                .graph_mut()
                .param_mut(ParamId::new(control, ParamKind::Offset))
            {
                param.cancel_scheduled_values(f64::NEG_INFINITY);
            }
        }
        if let Some(sound) = self.sound.take() {
            ctx.release(sound);
        }
        self.connection = None;
        self.was_triggered = false;
    }

    fn update_decay_level(&mut self) {
        self.decay_level =
            self.sustain_ratio * (self.attack_level - self.release_level) + self.release_level;
    }

    fn retarget(&mut self, ctx: &mut AudioContext, target: Option<Destination>) -> Result<()> {
        match target {
            Some(target) if self.connection != Some(target) => self.connect(ctx, target),
            _ => Ok(()),
        }
    }

    fn control_param<'a>(&self, ctx: &'a mut AudioContext) -> Result<&'a mut AudioParam> {
        let control = self.control.ok_or(Error::NodeGone)?;
        ctx.graph_mut()
            .param_mut(ParamId::new(control, ParamKind::Offset))
    }

    fn shape(&self) -> RampShape {
        if self.exponential {
            RampShape::Exponential
        } else {
            RampShape::Linear
        }
    }

    fn floor(&self, value: f32) -> f32 {
        if self.exponential && value <= self.epsilon {
            self.epsilon
        } else {
            value
        }
    }

    /// Read the value at `time`, cancel everything after it, and write the
    /// value back so the next ramp starts from it. An event already ending at
    /// `time` is left alone.
    fn anchor(&self, param: &mut AudioParam, time: f64) -> Result<()> {
        let value = self.floor(param.value_at(time));
        param.cancel_scheduled_values_after(time);
        if param.has_event_at(time) {
            return Ok(());
        }
        self.write_ramp(param, value, time)
    }

    /// One stage from `start` lasting `duration`. Returns its end time.
    fn write_stage(
        &self,
        param: &mut AudioParam,
        value: f32,
        start: f64,
        duration: f64,
    ) -> Result<f64> {
        if duration > 0.0 {
            let end = start + duration;
            self.write_ramp(param, value, end)?;
            Ok(end)
        } else {
            param.set_value_at_time(self.floor(value), start);
            Ok(start)
        }
    }

    fn write_ramp(&self, param: &mut AudioParam, value: f32, time: f64) -> Result<()> {
        match self.shape() {
            RampShape::Exponential => {
                param.exponential_ramp_to_value_at_time(self.floor(value), time)
            }
            _ => {
                param.linear_ramp_to_value_at_time(value, time);
                Ok(())
            }
        }
    }
}

fn check_stage_time(seconds: f64) -> Result<f64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(Error::InvalidEnvelope("stage times must be non-negative"))
    }
}
