use std::f32::consts::FRAC_PI_2;

use crate::{
    dsp::automation::RampShape,
    engine::{registry::SoundId, AudioContext},
    error::{check_offset, check_range, Error, Result},
    graph::node::{Destination, NodeId, ParamId, ParamKind},
};

/*
Effects
=======

Every effect is built around the same five gain stages:

             ┌──▶ dry ───────────────┐
  input ─────┤                       ├──▶ output ──▶ destination
             └──▶ [processing] ──▶ wet ──▶ wet_mix ─┘

The processing nodes are owned by the concrete effect; they read from
`input` and write into `wet`. `drywet` crossfades the two paths with an
equal-power curve, so a 50/50 mix does not dip in loudness.

Effects connect to the context destination when created. `chain` adds
edges; it does not remove the existing ones, so disconnect first when an
effect should only feed the next one in line.
*/

/// The shared wiring and lifecycle of an effect.
#[derive(Debug)]
pub struct EffectCore {
    input: NodeId,
    output: NodeId,
    wet: NodeId,
    dry: NodeId,
    wet_mix: NodeId,
    fade: f32,
    sound: Option<SoundId>,
}

impl EffectCore {
    /// Create the gain stages, connect the output to the destination and
    /// register the effect under `kind`.
    pub fn new(ctx: &mut AudioContext, kind: &'static str) -> Result<Self> {
        let destination = ctx.destination();
        let graph = ctx.graph_mut();
        let input = graph.create_gain(1.0);
        let output = graph.create_gain(1.0);
        let wet = graph.create_gain(1.0);
        let dry = graph.create_gain(0.0);
        let wet_mix = graph.create_gain(1.0);

        graph.connect(input, dry)?;
        graph.connect(dry, output)?;
        graph.connect(wet, wet_mix)?;
        graph.connect(wet_mix, output)?;
        graph.connect(output, destination)?;

        let sound = ctx.register(kind, vec![input, output, wet, dry, wet_mix]);
        Ok(Self {
            input,
            output,
            wet,
            dry,
            wet_mix,
            fade: 1.0,
            sound: Some(sound),
        })
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Where processing nodes deliver the effected signal.
    pub fn wet(&self) -> NodeId {
        self.wet
    }

    pub fn is_disposed(&self) -> bool {
        self.sound.is_none()
    }

    /// Hand ownership of effect-specific nodes to this effect so `dispose`
    /// removes them too.
    pub fn adopt(&self, ctx: &mut AudioContext, nodes: impl IntoIterator<Item = NodeId>) {
        if let Some(sound) = self.sound {
            ctx.adopt(sound, nodes);
        }
    }

    /// Current crossfade: 0 is fully dry, 1 fully wet.
    pub fn mix(&self) -> f32 {
        self.fade
    }

    pub fn drywet(&mut self, ctx: &mut AudioContext, fade: f32) -> Result<()> {
        check_range("drywet", fade as f64, 0.0, 1.0)?;
        let now = ctx.current_time();
        let angle = fade * FRAC_PI_2;
        set_param(ctx, ParamId::new(self.dry, ParamKind::Gain), angle.cos(), now)?;
        set_param(ctx, ParamId::new(self.wet_mix, ParamKind::Gain), angle.sin(), now)?;
        self.fade = fade;
        Ok(())
    }

    /// Ramp the output level to `volume` over `ramp_time`, starting
    /// `time_from_now` seconds from now.
    pub fn amp(
        &self,
        ctx: &mut AudioContext,
        volume: f32,
        ramp_time: f64,
        time_from_now: f64,
    ) -> Result<()> {
        check_range("volume", volume as f64, 0.0, f32::MAX as f64)?;
        let start = ctx.time_from_now(time_from_now)?;
        let end = start + check_offset(ramp_time)?;
        let param = ctx
            .graph_mut()
            .param_mut(ParamId::new(self.output, ParamKind::Gain))?;
        param.hold_at(start, RampShape::Linear);
        param.linear_ramp_to_value_at_time(volume, end);
        Ok(())
    }

    /// Output level at `time`.
    pub fn level_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        ctx.graph()
            .value_at(ParamId::new(self.output, ParamKind::Gain), time)
            .unwrap_or(0.0)
    }

    /// Disconnect and remove every owned node. Safe to call more than once,
    /// and after `AudioContext::dispose_all`.
    pub fn dispose(&mut self, ctx: &mut AudioContext) {
        if let Some(sound) = self.sound.take() {
            ctx.release(sound);
        }
    }
}

/// Jump a parameter to `value` at `time`, dropping anything scheduled after.
pub(crate) fn set_param(
    ctx: &mut AudioContext,
    param: ParamId,
    value: f32,
    time: f64,
) -> Result<()> {
    let param = ctx.graph_mut().param_mut(param)?;
    param.cancel_scheduled_values(time);
    param.set_value_at_time(value, time);
    Ok(())
}

/// An effect in a signal chain.
pub trait Effect {
    fn core(&self) -> &EffectCore;

    fn core_mut(&mut self) -> &mut EffectCore;

    fn input(&self) -> NodeId {
        self.core().input()
    }

    fn output(&self) -> NodeId {
        self.core().output()
    }

    /// Route a source into this effect.
    fn process_from(&self, ctx: &mut AudioContext, source: NodeId) -> Result<()> {
        ctx.graph_mut().connect(source, self.input())
    }

    fn connect(&self, ctx: &mut AudioContext, to: Destination) -> Result<()> {
        if self.core().is_disposed() {
            return Err(Error::NodeGone);
        }
        ctx.graph_mut().connect(self.output(), to)
    }

    fn disconnect(&self, ctx: &mut AudioContext) {
        ctx.graph_mut().disconnect(self.output());
    }

    /// Connect this effect into the first of `effects`, then each one into
    /// the next.
    fn chain(&self, ctx: &mut AudioContext, effects: &[&dyn Effect]) -> Result<()> {
        let mut from = self.output();
        for effect in effects {
            ctx.graph_mut().connect(from, effect.input())?;
            from = effect.output();
        }
        Ok(())
    }

    fn drywet(&mut self, ctx: &mut AudioContext, fade: f32) -> Result<()> {
        self.core_mut().drywet(ctx, fade)
    }

    fn amp(
        &self,
        ctx: &mut AudioContext,
        volume: f32,
        ramp_time: f64,
        time_from_now: f64,
    ) -> Result<()> {
        self.core().amp(ctx, volume, ramp_time, time_from_now)
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.core_mut().dispose(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bypass {
        core: EffectCore,
    }

    impl Bypass {
        fn new(ctx: &mut AudioContext) -> Self {
            let core = EffectCore::new(ctx, "bypass").unwrap();
            ctx.graph_mut().connect(core.input(), core.wet()).unwrap();
            Self { core }
        }
    }

    impl Effect for Bypass {
        fn core(&self) -> &EffectCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut EffectCore {
            &mut self.core
        }
    }

    #[test]
    fn new_effect_is_wet_and_routed_to_destination() {
        let mut ctx = AudioContext::default();
        let fx = Bypass::new(&mut ctx);
        let graph = ctx.graph();

        assert!(graph.is_connected(fx.output(), ctx.destination()));
        assert!(graph.is_connected(fx.core.dry, fx.output()));
        assert!(graph.is_connected(fx.core.wet_mix, fx.output()));
        assert_eq!(
            graph
                .value_at(ParamId::new(fx.core.dry, ParamKind::Gain), 0.0)
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn drywet_is_equal_power() {
        let mut ctx = AudioContext::default();
        let mut fx = Bypass::new(&mut ctx);

        fx.drywet(&mut ctx, 0.5).unwrap();

        let dry = ctx
            .graph()
            .value_at(ParamId::new(fx.core.dry, ParamKind::Gain), 0.0)
            .unwrap();
        let wet = ctx
            .graph()
            .value_at(ParamId::new(fx.core.wet_mix, ParamKind::Gain), 0.0)
            .unwrap();
        assert!((dry * dry + wet * wet - 1.0).abs() < 1e-6);
        assert!(fx.drywet(&mut ctx, 1.5).is_err());
        assert_eq!(fx.core().mix(), 0.5);
    }

    #[test]
    fn chain_connects_in_order() {
        let mut ctx = AudioContext::default();
        let a = Bypass::new(&mut ctx);
        let b = Bypass::new(&mut ctx);
        let c = Bypass::new(&mut ctx);

        a.chain(&mut ctx, &[&b, &c]).unwrap();

        assert!(ctx.graph().is_connected(a.output(), b.input()));
        assert!(ctx.graph().is_connected(b.output(), c.input()));
        assert!(!ctx.graph().is_connected(a.output(), c.input()));
    }

    #[test]
    fn amp_ramps_output() {
        let mut ctx = AudioContext::default();
        let fx = Bypass::new(&mut ctx);

        fx.amp(&mut ctx, 0.0, 1.0, 0.0).unwrap();

        assert!((fx.core().level_at(&ctx, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(fx.core().level_at(&ctx, 2.0), 0.0);
    }

    #[test]
    fn dispose_twice_and_after_sweep() {
        let mut ctx = AudioContext::default();
        let before = ctx.graph().len();
        let mut a = Bypass::new(&mut ctx);
        let mut b = Bypass::new(&mut ctx);

        a.dispose(&mut ctx);
        a.dispose(&mut ctx);
        assert_eq!(ctx.dispose_all(), 1);
        b.dispose(&mut ctx);

        let destination = ctx.destination();
        assert_eq!(ctx.graph().len(), before);
        assert_eq!(a.connect(&mut ctx, destination.into()), Err(Error::NodeGone));
    }
}
