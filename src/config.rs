#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sequencing::duration::Duration,
};

/// Attack/decay/sustain/release defaults handed to new voices.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrConfig {
    pub attack: f64,
    pub decay: f64,
    /// Sustain as a ratio of the attack level.
    pub sustain: f32,
    pub release: f64,
}

impl Default for AdsrConfig {
    fn default() -> Self {
        Self {
            attack: 0.02,
            decay: 0.25,
            sustain: 0.05,
            release: 0.35,
        }
    }
}

/// Engine-wide settings. The two tolerances were tuned empirically and the
/// right value depends on the host, so both live here instead of in code.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Ticks closer than `period - tick_tolerance` to the previous tick, or
    /// older than `now - tick_tolerance` when polled, are dropped.
    pub tick_tolerance: f64,
    /// How far ahead of the audio clock ticks are handed out.
    pub clock_lookahead: f64,
    /// Floor applied to exponential ramp targets (they cannot reach zero).
    pub exp_epsilon: f32,
    /// Sustain used by `play` when the caller gives none.
    pub default_sustain: f64,
    pub default_bpm: f64,
    pub default_tatum: Duration,
    pub default_voices: usize,
    pub adsr: AdsrConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            tick_tolerance: 0.02,
            clock_lookahead: 0.1,
            exp_epsilon: 1e-8,
            default_sustain: 0.15,
            default_bpm: 60.0,
            default_tatum: Duration::SIXTEENTH,
            default_voices: 8,
            adsr: AdsrConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(Error::Config(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(self.tick_tolerance.is_finite() && self.tick_tolerance >= 0.0) {
            return Err(Error::Config(format!(
                "tick_tolerance must be non-negative, got {}",
                self.tick_tolerance
            )));
        }
        if !(self.clock_lookahead.is_finite() && self.clock_lookahead >= 0.0) {
            return Err(Error::Config(format!(
                "clock_lookahead must be non-negative, got {}",
                self.clock_lookahead
            )));
        }
        if !(self.exp_epsilon.is_finite() && self.exp_epsilon > 0.0) {
            return Err(Error::Config(format!(
                "exp_epsilon must be positive, got {}",
                self.exp_epsilon
            )));
        }
        if !(self.default_bpm.is_finite() && self.default_bpm > 0.0) {
            return Err(Error::Config(format!(
                "default_bpm must be positive, got {}",
                self.default_bpm
            )));
        }
        if self.default_voices == 0 {
            return Err(Error::EmptyVoicePool);
        }
        Ok(())
    }
}
