use crate::{
    engine::AudioContext,
    error::{check_range, Error, Result},
    graph::{
        effect::{set_param, Effect, EffectCore},
        node::{FilterType, NodeId, NodeKind, ParamId, ParamKind},
    },
};

/// One peaking band of an [`Equalizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBand {
    filter: NodeId,
    enabled: bool,
}

impl EqBand {
    pub fn filter(&self) -> NodeId {
        self.filter
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn freq_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        read(ctx, ParamId::new(self.filter, ParamKind::Frequency), time)
    }

    pub fn res_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        read(ctx, ParamId::new(self.filter, ParamKind::Q), time)
    }

    pub fn gain_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        read(ctx, ParamId::new(self.filter, ParamKind::FilterGain), time)
    }
}

/// Multi-band equaliser: 3 or 8 peaking filters in series.
///
/// The lowest band sits at 100 Hz. With 8 bands the next centres double from
/// 360 Hz; with 3 the middle band sits at 2880 Hz. The top band is at 21 kHz
/// with a very wide Q, so it behaves like a gentle high shelf.
pub struct Equalizer {
    core: EffectCore,
    bands: Vec<EqBand>,
}

impl Equalizer {
    pub fn new(ctx: &mut AudioContext, size: usize) -> Result<Self> {
        if size != 3 && size != 8 {
            return Err(Error::InvalidBandCount(size));
        }
        let core = EffectCore::new(ctx, "eq")?;
        let factor = if size == 3 { 8.0 } else { 2.0 };
        let now = ctx.current_time();

        let mut bands = Vec::with_capacity(size);
        let mut freq = 0.0_f32;
        let mut previous = core.input();
        for i in 0..size {
            let (band_freq, res) = if i == size - 1 {
                (21_000.0, 0.01)
            } else if i == 0 {
                (100.0, 0.1)
            } else if i == 1 {
                (if size == 3 { 360.0 * factor } else { 360.0 }, 1.0)
            } else {
                (freq * factor, 1.0)
            };
            freq = band_freq;

            let filter = ctx.graph_mut().create_biquad(FilterType::Peaking);
            set_param(ctx, ParamId::new(filter, ParamKind::Frequency), freq, now)?;
            set_param(ctx, ParamId::new(filter, ParamKind::Q), res, now)?;
            ctx.graph_mut().connect(previous, filter)?;
            core.adopt(ctx, [filter]);
            previous = filter;
            bands.push(EqBand {
                filter,
                enabled: true,
            });
        }
        ctx.graph_mut().connect(previous, core.wet())?;

        Ok(Self { core, bands })
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Result<&EqBand> {
        let len = self.bands.len();
        self.bands.get(index).ok_or(Error::IndexOutOfRange {
            what: "bands",
            index,
            len,
        })
    }

    /// Boost or cut a band, in dB.
    pub fn band_gain(&mut self, ctx: &mut AudioContext, index: usize, gain: f32) -> Result<()> {
        check_range("gain", gain as f64, -40.0, 40.0)?;
        let filter = self.band(index)?.filter;
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(filter, ParamKind::FilterGain), gain, now)
    }

    pub fn band_freq(&mut self, ctx: &mut AudioContext, index: usize, freq: f32) -> Result<()> {
        if !(freq.is_finite() && freq > 0.0) {
            return Err(Error::InvalidFrequency(freq as f64));
        }
        let filter = self.band(index)?.filter;
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(filter, ParamKind::Frequency), freq, now)
    }

    pub fn band_res(&mut self, ctx: &mut AudioContext, index: usize, res: f32) -> Result<()> {
        check_range("res", res as f64, 0.0001, 1000.0)?;
        let filter = self.band(index)?.filter;
        let now = ctx.current_time();
        set_param(ctx, ParamId::new(filter, ParamKind::Q), res, now)
    }

    /// Set `(freq, gain)` pairs starting at band 0.
    pub fn set(&mut self, ctx: &mut AudioContext, settings: &[(f32, f32)]) -> Result<()> {
        for (index, &(freq, gain)) in settings.iter().enumerate() {
            self.band_freq(ctx, index, freq)?;
            self.band_gain(ctx, index, gain)?;
        }
        Ok(())
    }

    /// Bypass or restore one band. Returns whether it is now active.
    pub fn toggle_band(&mut self, ctx: &mut AudioContext, index: usize) -> Result<bool> {
        let len = self.bands.len();
        let band = self.bands.get_mut(index).ok_or(Error::IndexOutOfRange {
            what: "bands",
            index,
            len,
        })?;
        band.enabled = !band.enabled;
        let kind = if band.enabled {
            FilterType::Peaking
        } else {
            FilterType::AllPass
        };
        ctx.graph_mut().set_kind(band.filter, NodeKind::Biquad(kind))?;
        Ok(band.enabled)
    }
}

impl Effect for Equalizer {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }
}

fn read(ctx: &AudioContext, param: ParamId, time: f64) -> f32 {
    ctx.graph().value_at(param, time).unwrap_or(0.0)
}
