use thiserror::Error;

use crate::graph::node::ParamKind;

/// Caller-contract violations raised by the scheduling core.
///
/// Expected runtime conditions (releasing an idle note, overflowing the voice
/// pool) are handled locally and never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid note `{0}`")]
    InvalidNote(String),

    #[error("frequency must be positive and finite, got {0}")]
    InvalidFrequency(f64),

    #[error("time offset must be non-negative and finite, got {0}")]
    InvalidTime(f64),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(&'static str),

    #[error("exponential ramp target must be non-zero and finite, got {0}")]
    InvalidRampTarget(f32),

    #[error("{name} must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("voice pool must hold at least one voice")]
    EmptyVoicePool,

    #[error("index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("an EQ has 3 or 8 bands, not {0}")]
    InvalidBandCount(usize),

    #[error("tatum must be a positive fraction of a whole note")]
    InvalidTatum,

    #[error("no phrase named `{0}`")]
    PhraseNotFound(String),

    #[error("audio node no longer exists")]
    NodeGone,

    #[error("node has no {0:?} parameter")]
    MissingParam(ParamKind),

    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reject negative, NaN or infinite "seconds from now" offsets.
pub(crate) fn check_offset(seconds: f64) -> Result<f64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(Error::InvalidTime(seconds))
    }
}

pub(crate) fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<f64> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::OutOfRange {
            name,
            min,
            max,
            value,
        })
    }
}
