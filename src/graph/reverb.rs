use crate::{
    engine::AudioContext,
    error::{check_range, Result},
    graph::{
        effect::{Effect, EffectCore},
        node::{Impulse, NodeId, NodeKind},
    },
};

/*
Reverb
======

A convolver fed with a synthetic impulse response: noise shaped by a decay
curve.

  input ──▶ convolver ──▶ wet

Seconds (0 - 10): length of the impulse, i.e. how long the tail rings.

Decay (0 - 100): steepness of the fade. The envelope of sample n out of N is
(1 - n/N)^decay, so 0 is a flat block of noise and large values die almost
immediately.

Reverse: play the impulse backwards, the swelling "pre-echo" effect.

Changing any of the three rebuilds the impulse.
*/

pub const DEFAULT_SECONDS: f32 = 3.0;
pub const DEFAULT_DECAY: f32 = 2.0;

pub struct Reverb {
    core: EffectCore,
    convolver: NodeId,
    impulse: Impulse,
}

impl Reverb {
    pub fn new(ctx: &mut AudioContext) -> Result<Self> {
        let core = EffectCore::new(ctx, "reverb")?;
        let impulse = Impulse {
            seconds: DEFAULT_SECONDS,
            decay: DEFAULT_DECAY,
            reverse: false,
        };
        let convolver = ctx.graph_mut().create(NodeKind::Convolver(Some(impulse)));
        ctx.graph_mut().connect(core.input(), convolver)?;
        ctx.graph_mut().connect(convolver, core.wet())?;
        core.adopt(ctx, [convolver]);

        Ok(Self {
            core,
            convolver,
            impulse,
        })
    }

    /// Route `source` in and rebuild the impulse.
    pub fn process(
        &mut self,
        ctx: &mut AudioContext,
        source: NodeId,
        seconds: f32,
        decay: f32,
        reverse: bool,
    ) -> Result<()> {
        self.process_from(ctx, source)?;
        self.set(ctx, seconds, decay, reverse)
    }

    pub fn set(
        &mut self,
        ctx: &mut AudioContext,
        seconds: f32,
        decay: f32,
        reverse: bool,
    ) -> Result<()> {
        check_range("seconds", seconds as f64, 0.0, 10.0)?;
        check_range("decay", decay as f64, 0.0, 100.0)?;
        let impulse = Impulse {
            seconds,
            decay,
            reverse,
        };
        ctx.graph_mut()
            .set_kind(self.convolver, NodeKind::Convolver(Some(impulse)))?;
        self.impulse = impulse;
        Ok(())
    }

    pub fn impulse(&self) -> Impulse {
        self.impulse
    }

    pub fn convolver(&self) -> NodeId {
        self.convolver
    }

    /// Length of the impulse in samples at `sample_rate`.
    pub fn impulse_len(&self, sample_rate: f32) -> usize {
        (sample_rate * self.impulse.seconds) as usize
    }

    /// Decay envelope of the impulse at `time` seconds into it.
    pub fn impulse_gain_at(&self, time: f32) -> f32 {
        let Impulse {
            seconds,
            decay,
            reverse,
        } = self.impulse;
        if seconds <= 0.0 || !(0.0..seconds).contains(&time) {
            return 0.0;
        }
        let n = if reverse { seconds - time } else { time };
        (1.0 - n / seconds).powf(decay)
    }
}

impl Effect for Reverb {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }
}
