use std::f32::consts::PI;

use crate::{
    engine::AudioContext,
    error::{check_range, Result},
    graph::{
        effect::{Effect, EffectCore},
        node::{NodeId, NodeKind, Oversample},
    },
};

/*
Waveshaping Distortion
======================

  input ──▶ shaper ──▶ wet

The shaper maps every input sample x in -1..1 through a fixed curve:

  k = amount * 2000
  f(x) = (3 + k) * x * 20° / (π + k * |x|)

At amount 0 the curve is a near-linear soft slope; as k grows the curve
saturates sooner and the output squares off.

Oversampling renders the shaper at 2x or 4x to push the aliasing the curve
creates above the audible band.
*/

pub struct Distortion {
    core: EffectCore,
    shaper: NodeId,
    amount: f32,
    oversample: Oversample,
}

impl Distortion {
    pub fn new(ctx: &mut AudioContext, amount: f32, oversample: Oversample) -> Result<Self> {
        check_range("amount", amount as f64, 0.0, 1.0)?;
        let core = EffectCore::new(ctx, "distortion")?;
        let shaper = ctx.graph_mut().create(NodeKind::WaveShaper { amount, oversample });
        ctx.graph_mut().connect(core.input(), shaper)?;
        ctx.graph_mut().connect(shaper, core.wet())?;
        core.adopt(ctx, [shaper]);

        Ok(Self {
            core,
            shaper,
            amount,
            oversample,
        })
    }

    pub fn process(
        &mut self,
        ctx: &mut AudioContext,
        source: NodeId,
        amount: f32,
        oversample: Oversample,
    ) -> Result<()> {
        self.process_from(ctx, source)?;
        self.set(ctx, amount, oversample)
    }

    pub fn set(
        &mut self,
        ctx: &mut AudioContext,
        amount: f32,
        oversample: Oversample,
    ) -> Result<()> {
        check_range("amount", amount as f64, 0.0, 1.0)?;
        ctx.graph_mut()
            .set_kind(self.shaper, NodeKind::WaveShaper { amount, oversample })?;
        self.amount = amount;
        self.oversample = oversample;
        Ok(())
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn oversample(&self) -> Oversample {
        self.oversample
    }

    /// The shaping curve at input `x`.
    pub fn shape(&self, x: f32) -> f32 {
        let k = self.amount * 2000.0;
        let deg = PI / 180.0;
        (3.0 + k) * x * 20.0 * deg / (PI + k * x.abs())
    }
}

impl Effect for Distortion {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_is_validated() {
        let mut ctx = AudioContext::default();
        assert!(Distortion::new(&mut ctx, 1.5, Oversample::None).is_err());

        let mut dist = Distortion::new(&mut ctx, 0.25, Oversample::X2).unwrap();
        assert!(dist.set(&mut ctx, -0.1, Oversample::X4).is_err());
        assert_eq!(dist.amount(), 0.25);
        assert_eq!(dist.oversample(), Oversample::X2);
    }

    #[test]
    fn curve_is_odd_and_saturates_with_amount() {
        let mut ctx = AudioContext::default();
        let mut dist = Distortion::new(&mut ctx, 0.0, Oversample::None).unwrap();
        let soft = dist.shape(0.5);
        assert_eq!(dist.shape(-0.5), -soft);

        dist.set(&mut ctx, 1.0, Oversample::X4).unwrap();
        assert!(dist.shape(0.5) > soft);
        assert_eq!(
            ctx.graph().node(dist.shaper).unwrap().kind(),
            &NodeKind::WaveShaper {
                amount: 1.0,
                oversample: Oversample::X4
            }
        );
    }
}
