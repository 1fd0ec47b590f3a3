use crate::{
    engine::AudioContext,
    error::{check_range, Result},
    graph::{
        effect::{set_param, Effect, EffectCore},
        node::{NodeId, NodeKind, ParamId, ParamKind},
    },
};

/// Dynamics compressor settings with the ranges the graph accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// Seconds to reduce gain by 10 dB, 0..=1.
    pub attack: f32,
    /// dB above the threshold where the curve eases into the ratio, 0..=40.
    pub knee: f32,
    /// dB of input change per 1 dB of output, 1..=20.
    pub ratio: f32,
    /// dB above which compression starts, -100..=0.
    pub threshold: f32,
    /// Seconds to recover 10 dB, 0..=1.
    pub release: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            attack: 0.003,
            knee: 30.0,
            ratio: 12.0,
            threshold: -24.0,
            release: 0.25,
        }
    }
}

pub struct Compressor {
    core: EffectCore,
    node: NodeId,
}

impl Compressor {
    pub fn new(ctx: &mut AudioContext) -> Result<Self> {
        let core = EffectCore::new(ctx, "compressor")?;
        let node = ctx.graph_mut().create(NodeKind::Compressor);
        ctx.graph_mut().connect(core.input(), node)?;
        ctx.graph_mut().connect(node, core.wet())?;
        core.adopt(ctx, [node]);
        Ok(Self { core, node })
    }

    pub fn process(
        &mut self,
        ctx: &mut AudioContext,
        source: NodeId,
        settings: CompressorSettings,
    ) -> Result<()> {
        self.process_from(ctx, source)?;
        self.set(ctx, settings)
    }

    /// Apply every setting; nothing changes if any of them is out of range.
    pub fn set(&mut self, ctx: &mut AudioContext, settings: CompressorSettings) -> Result<()> {
        let CompressorSettings {
            attack,
            knee,
            ratio,
            threshold,
            release,
        } = settings;
        check_range("attack", attack as f64, 0.0, 1.0)?;
        check_range("knee", knee as f64, 0.0, 40.0)?;
        check_range("ratio", ratio as f64, 1.0, 20.0)?;
        check_range("threshold", threshold as f64, -100.0, 0.0)?;
        check_range("release", release as f64, 0.0, 1.0)?;

        self.attack(ctx, attack)?;
        self.knee(ctx, knee)?;
        self.ratio(ctx, ratio)?;
        self.threshold(ctx, threshold)?;
        self.release(ctx, release)
    }

    pub fn attack(&mut self, ctx: &mut AudioContext, seconds: f32) -> Result<()> {
        self.write(ctx, ParamKind::Attack, "attack", seconds, (0.0, 1.0))
    }

    pub fn knee(&mut self, ctx: &mut AudioContext, db: f32) -> Result<()> {
        self.write(ctx, ParamKind::Knee, "knee", db, (0.0, 40.0))
    }

    pub fn ratio(&mut self, ctx: &mut AudioContext, ratio: f32) -> Result<()> {
        self.write(ctx, ParamKind::Ratio, "ratio", ratio, (1.0, 20.0))
    }

    pub fn threshold(&mut self, ctx: &mut AudioContext, db: f32) -> Result<()> {
        self.write(ctx, ParamKind::Threshold, "threshold", db, (-100.0, 0.0))
    }

    pub fn release(&mut self, ctx: &mut AudioContext, seconds: f32) -> Result<()> {
        self.write(ctx, ParamKind::Release, "release", seconds, (0.0, 1.0))
    }

    /// The settings in effect at `time`.
    pub fn settings_at(&self, ctx: &AudioContext, time: f64) -> CompressorSettings {
        let read = |kind| {
            ctx.graph()
                .value_at(ParamId::new(self.node, kind), time)
                .unwrap_or(0.0)
        };
        CompressorSettings {
            attack: read(ParamKind::Attack),
            knee: read(ParamKind::Knee),
            ratio: read(ParamKind::Ratio),
            threshold: read(ParamKind::Threshold),
            release: read(ParamKind::Release),
        }
    }

    fn write(
        &mut self,
        ctx: &mut AudioContext,
        kind: ParamKind,
        name: &'static str,
        value: f32,
        (min, max): (f32, f32),
    ) -> Result<()> {
        check_range(name, value as f64, min as f64, max as f64)?;
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(self.node, kind), value, now)
    }
}

impl Effect for Compressor {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }
}
