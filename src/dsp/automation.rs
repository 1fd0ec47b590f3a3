#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::timeline::Timeline,
    error::{Error, Result},
};

/*
Parameter Automation
====================

An `AudioParam` is a number whose value is a function of audio-clock time.
Callers never set "the value"; they write timestamped instructions into the
parameter's automation timeline and the engine evaluates the curve later.

Each event says "be at `value` by `time`" and carries the shape of the
segment that *ends* at it:

  Step         hold the previous value, jump at `time`
  Linear       straight line from the previous event
  Exponential  v0 * (v1 / v0)^progress from the previous event

    value
      1.0 ┤        ●──────●
          │       ╱        ╲
          │      ╱          ╲ Linear
      0.0 ┼─────●            ●────
          0.0  0.1   0.3    0.6      time

Exponential segments cannot reach or leave zero, and cannot cross zero. When
the previous value is zero or has the opposite sign the segment holds the
previous value until its end time, as the Web Audio model does.

The Anchor
----------

Retriggering a curve in the middle of a ramp is where clicks come from: if the
new ramp starts from a stale point the output jumps. `hold_at` is the
three-step cure every scheduler in this crate uses before writing a new ramp:

  1. read the value the curve would have at T
  2. cancel every event after T
  3. write that same value at T, unless an event already ends at T

Events sitting exactly at T are kept: the segment leading into T depends on
the first of them, so dropping one would bend the curve *before* the anchor.
The curve up to T is unchanged, and the next ramp starts exactly where the
sound currently is.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    Step,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Automation {
    pub value: f32,
    pub shape: RampShape,
}

#[derive(Debug, Clone)]
pub struct AudioParam {
    default_value: f32,
    min_value: f32,
    max_value: f32,
    events: Timeline<Automation>,
}

impl AudioParam {
    pub fn new(default_value: f32) -> Self {
        Self::with_range(default_value, f32::MIN, f32::MAX)
    }

    pub fn with_range(default_value: f32, min_value: f32, max_value: f32) -> Self {
        Self {
            default_value,
            min_value,
            max_value,
            events: Timeline::new(),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Number of scheduled automation events.
    pub fn scheduled_len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> impl Iterator<Item = (f64, Automation)> + '_ {
        self.events.iter().map(|event| (event.time, event.value))
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.push(value, time, RampShape::Step);
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.push(value, time, RampShape::Linear);
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> Result<()> {
        if value == 0.0 || !value.is_finite() {
            return Err(Error::InvalidRampTarget(value));
        }
        self.push(value, time, RampShape::Exponential);
        Ok(())
    }

    /// Drop every event at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.cancel(time);
    }

    /// Drop every event strictly after `time`.
    pub fn cancel_scheduled_values_after(&mut self, time: f64) {
        self.events.cancel_after(time);
    }

    /// Whether some event lands exactly on `time`.
    pub fn has_event_at(&self, time: f64) -> bool {
        self.events.event_at(time).is_some_and(|event| event.time == time)
    }

    /// Anchor the curve at `time`: read, cancel, re-write. Returns the value
    /// the curve now holds at `time`.
    pub fn hold_at(&mut self, time: f64, shape: RampShape) -> f32 {
        let value = self.value_at(time);
        self.cancel_scheduled_values_after(time);
        if self.has_event_at(time) {
            return value;
        }

        match shape {
            RampShape::Exponential if value != 0.0 => {
                self.push(value, time, RampShape::Exponential);
            }
            RampShape::Step => self.push(value, time, RampShape::Step),
            _ => self.push(value, time, RampShape::Linear),
        }

        value
    }

    /// Evaluate the scheduled curve at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let (prev, next) = self.events.neighbours(time);
        let (t0, v0) = match prev {
            Some(event) => (event.time, event.value.value),
            None => (0.0_f64.min(time), self.default_value),
        };

        let value = match next {
            None => v0,
            Some(next) => {
                let (t1, v1) = (next.time, next.value.value);
                let span = t1 - t0;
                let progress = if span > 0.0 {
                    ((time - t0) / span).clamp(0.0, 1.0) as f32
                } else {
                    1.0
                };

                match next.value.shape {
                    RampShape::Step => v0,
                    RampShape::Linear => v0 + (v1 - v0) * progress,
                    RampShape::Exponential => {
                        if v0 != 0.0 && v0.signum() == v1.signum() {
                            v0 * (v1 / v0).powf(progress)
                        } else {
                            v0
                        }
                    }
                }
            }
        };

        value.clamp(self.min_value, self.max_value)
    }

    /// Discard events that can no longer influence values at or after `time`.
    pub fn forget_before(&mut self, time: f64) {
        self.events.forget_before(time);
    }

    fn push(&mut self, value: f32, time: f64, shape: RampShape) {
        self.events.add(time, Automation { value, shape });
    }
}
