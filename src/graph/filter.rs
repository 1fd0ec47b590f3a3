use tracing::debug;

use crate::{
    engine::AudioContext,
    error::{check_range, Error, Result},
    graph::{
        effect::{set_param, Effect, EffectCore},
        node::{FilterType, NodeId, NodeKind, ParamId, ParamKind},
    },
};

/*
Filter
======

A biquad between the effect input and its wet path.

  input ──▶ biquad ──▶ wet

Frequency (Hz): where the filter takes effect. For lowpass and highpass this
is the cutoff; for bandpass, peaking and notch it is the centre.

Resonance (Q): emphasis around the frequency. Around 1 is neutral, high
values ring.

Gain (dB): only heard by the shelf and peaking types.

Toggle
------

`toggle` swaps the biquad to an allpass and back, which bypasses the tone
change without touching the routing or the scheduled parameters.
*/

pub struct Filter {
    core: EffectCore,
    biquad: NodeId,
    filter_type: FilterType,
    enabled: bool,
}

impl Filter {
    pub fn new(ctx: &mut AudioContext, filter_type: FilterType) -> Result<Self> {
        let core = EffectCore::new(ctx, "filter")?;
        let biquad = ctx.graph_mut().create_biquad(filter_type);
        ctx.graph_mut().connect(core.input(), biquad)?;
        ctx.graph_mut().connect(biquad, core.wet())?;
        core.adopt(ctx, [biquad]);

        Ok(Self {
            core,
            biquad,
            filter_type,
            enabled: true,
        })
    }

    pub fn low_pass(ctx: &mut AudioContext) -> Result<Self> {
        Self::new(ctx, FilterType::LowPass)
    }

    pub fn high_pass(ctx: &mut AudioContext) -> Result<Self> {
        Self::new(ctx, FilterType::HighPass)
    }

    pub fn band_pass(ctx: &mut AudioContext) -> Result<Self> {
        Self::new(ctx, FilterType::BandPass)
    }

    pub fn biquad(&self) -> NodeId {
        self.biquad
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_type(&mut self, ctx: &mut AudioContext, filter_type: FilterType) -> Result<()> {
        self.filter_type = filter_type;
        if self.enabled {
            ctx.graph_mut()
                .set_kind(self.biquad, NodeKind::Biquad(filter_type))?;
        }
        Ok(())
    }

    /// Route `source` in and set frequency and resonance in one call.
    pub fn process(
        &mut self,
        ctx: &mut AudioContext,
        source: NodeId,
        freq: f32,
        res: f32,
        time_from_now: f64,
    ) -> Result<()> {
        self.process_from(ctx, source)?;
        self.set(ctx, freq, res, time_from_now)
    }

    pub fn set(
        &mut self,
        ctx: &mut AudioContext,
        freq: f32,
        res: f32,
        time_from_now: f64,
    ) -> Result<()> {
        self.freq(ctx, freq, time_from_now)?;
        self.res(ctx, res, time_from_now)
    }

    pub fn freq(&mut self, ctx: &mut AudioContext, freq: f32, time_from_now: f64) -> Result<()> {
        if !(freq.is_finite() && freq > 0.0) {
            return Err(Error::InvalidFrequency(freq as f64));
        }
        let t = ctx.time_from_now(time_from_now)?;
        set_param(ctx, self.param(ParamKind::Frequency), freq, t)
    }

    pub fn res(&mut self, ctx: &mut AudioContext, res: f32, time_from_now: f64) -> Result<()> {
        check_range("res", res as f64, 0.0001, 1000.0)?;
        let t = ctx.time_from_now(time_from_now)?;
        set_param(ctx, self.param(ParamKind::Q), res, t)
    }

    /// Shelf and peaking gain in dB.
    pub fn gain(&mut self, ctx: &mut AudioContext, gain: f32, time_from_now: f64) -> Result<()> {
        check_range("gain", gain as f64, -40.0, 40.0)?;
        let t = ctx.time_from_now(time_from_now)?;
        set_param(ctx, self.param(ParamKind::FilterGain), gain, t)
    }

    pub fn freq_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.read(ctx, ParamKind::Frequency, time)
    }

    pub fn res_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.read(ctx, ParamKind::Q, time)
    }

    pub fn gain_at(&self, ctx: &AudioContext, time: f64) -> f32 {
        self.read(ctx, ParamKind::FilterGain, time)
    }

    /// Bypass or restore the filter. Returns whether it is now active.
    pub fn toggle(&mut self, ctx: &mut AudioContext) -> Result<bool> {
        self.enabled = !self.enabled;
        let kind = if self.enabled {
            self.filter_type
        } else {
            FilterType::AllPass
        };
        ctx.graph_mut().set_kind(self.biquad, NodeKind::Biquad(kind))?;
        debug!(enabled = self.enabled, "filter toggled");
        Ok(self.enabled)
    }

    fn param(&self, kind: ParamKind) -> ParamId {
        ParamId::new(self.biquad, kind)
    }

    fn read(&self, ctx: &AudioContext, kind: ParamKind, time: f64) -> f32 {
        ctx.graph().value_at(self.param(kind), time).unwrap_or(0.0)
    }
}

impl Effect for Filter {
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
    use crate::graph::node::Waveform;

    #[test]
    fn schedules_frequency_from_now() {
        let mut ctx = AudioContext::default();
        let mut filter = Filter::low_pass(&mut ctx).unwrap();
        ctx.advance_to(1.0);

        filter.freq(&mut ctx, 800.0, 0.5).unwrap();

        assert_eq!(filter.freq_at(&ctx, 1.2), 350.0);
        assert_eq!(filter.freq_at(&ctx, 1.5), 800.0);
        assert!(filter.freq(&mut ctx, -1.0, 0.0).is_err());
        assert!(filter.res(&mut ctx, 0.0, 0.0).is_err());
    }

    #[test]
    fn toggle_swaps_to_allpass_and_back() {
        let mut ctx = AudioContext::default();
        let mut filter = Filter::high_pass(&mut ctx).unwrap();
        let kind =
            |ctx: &AudioContext, f: &Filter| ctx.graph().node(f.biquad()).unwrap().kind().clone();

        assert!(!filter.toggle(&mut ctx).unwrap());
        assert_eq!(kind(&ctx, &filter), NodeKind::Biquad(FilterType::AllPass));

        filter.set_type(&mut ctx, FilterType::Notch).unwrap();
        assert_eq!(kind(&ctx, &filter), NodeKind::Biquad(FilterType::AllPass));

        assert!(filter.toggle(&mut ctx).unwrap());
        assert_eq!(kind(&ctx, &filter), NodeKind::Biquad(FilterType::Notch));
    }

    #[test]
    fn process_routes_source_through_biquad() {
        let mut ctx = AudioContext::default();
        let mut filter = Filter::band_pass(&mut ctx).unwrap();
        let osc = ctx.graph_mut().create_oscillator(Waveform::Sawtooth);

        filter.process(&mut ctx, osc, 1000.0, 4.0, 0.0).unwrap();

        assert!(ctx.graph().is_connected(osc, filter.input()));
        assert!(ctx.graph().is_connected(filter.input(), filter.biquad()));
        assert_eq!(filter.res_at(&ctx, 0.0), 4.0);
    }
}
