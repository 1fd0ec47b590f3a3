use tracing::{debug, trace};

use crate::{
    config::EngineConfig,
    dsp::{
        automation::{AudioParam, RampShape},
        timeline::Timeline,
    },
    engine::TimeBase,
    error::{check_offset, Error, Result},
};

/*
Clock
=====

A tick source locked to the audio clock. The host calls `poll(now)` from its
audio callback (or any loop that can read the audio time); the clock hands
back every tick whose nominal time falls inside `now + lookahead`, so callers
can schedule automation slightly ahead of the sound.

  ticks:   |    |    |    |    |    |
  time ────┼────┼────┼────┼────┼────┼────▶
                  ▲ now      ▲ now + lookahead
                  └── ticks up to here are handed out on this poll

Tick times come from the frequency curve, never from when `poll` happened
to run, so a late or jittery host loop does not drift the grid.

Guards
------

  late      a tick older than `now - tolerance` when finally polled is
            skipped (its index is consumed) rather than fired late
  spurious  a tick arriving less than `period - tolerance` after the
            previous one is dropped; this catches duplicate ticks injected
            with `tick_at` while the grid is being corrected

Transport
---------

Start/stop/pause are scheduled on a state timeline, so a stop one bar from
now takes effect exactly there. Stop rewinds the tick counter; pause keeps it.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Started,
    Stopped,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Audio-clock time the tick is due.
    pub time: f64,
    /// Ticks since the clock was (re)started.
    pub index: u64,
}

#[derive(Debug, Clone)]
pub struct Clock {
    frequency: AudioParam,
    state: Timeline<ClockState>,
    lookahead: f64,
    tolerance: f64,
    next_tick: Option<f64>,
    prev_tick: Option<f64>,
    ticks: u64,
    skipped: u64,
}

impl Clock {
    /// A stopped clock ticking `frequency` times per second once started.
    pub fn new(frequency: f64) -> Result<Self> {
        Self::with_config(frequency, &EngineConfig::default())
    }

    pub fn with_config(frequency: f64, config: &EngineConfig) -> Result<Self> {
        check_frequency(frequency)?;
        Ok(Self {
            frequency: AudioParam::new(frequency as f32),
            state: Timeline::new(),
            lookahead: config.clock_lookahead,
            tolerance: config.tick_tolerance,
            next_tick: None,
            prev_tick: None,
            ticks: 0,
            skipped: 0,
        })
    }

    /// Change the tick rate. With a `ramp_time` the rate glides linearly
    /// instead of jumping.
    pub fn set_frequency(
        &mut self,
        time: &impl TimeBase,
        frequency: f64,
        ramp_time: f64,
    ) -> Result<()> {
        check_frequency(frequency)?;
        let ramp_time = check_offset(ramp_time)?;
        let now = time.current_time();

        self.frequency.hold_at(now, RampShape::Linear);
        if ramp_time > 0.0 {
            self.frequency
                .linear_ramp_to_value_at_time(frequency as f32, now + ramp_time);
        } else {
            self.frequency.set_value_at_time(frequency as f32, now);
        }
        Ok(())
    }

    pub fn frequency_at(&self, time: f64) -> f64 {
        self.frequency.value_at(time) as f64
    }

    pub fn period_at(&self, time: f64) -> f64 {
        1.0 / self.frequency_at(time)
    }

    pub fn start(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let t = time.current_time() + check_offset(time_from_now)?;
        self.start_at(t);
        Ok(())
    }

    pub fn stop(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let t = time.current_time() + check_offset(time_from_now)?;
        self.stop_at(t);
        Ok(())
    }

    pub fn pause(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let t = time.current_time() + check_offset(time_from_now)?;
        self.pause_at(t);
        Ok(())
    }

    pub(crate) fn start_at(&mut self, t: f64) {
        if self.state_at(t) == ClockState::Started {
            return;
        }
        self.state.add(t, ClockState::Started);
        match self.next_tick {
            Some(next) if next <= t => {}
            _ => self.next_tick = Some(t),
        }
        debug!(time = t, "clock start");
    }

    pub(crate) fn stop_at(&mut self, t: f64) {
        self.state.add(t, ClockState::Stopped);
        if self.next_tick.map_or(true, |next| next >= t) {
            self.rewind();
            self.next_tick = self.next_start_after(t);
        }
        debug!(time = t, "clock stop");
    }

    pub(crate) fn pause_at(&mut self, t: f64) {
        if self.state_at(t) != ClockState::Started {
            return;
        }
        self.state.add(t, ClockState::Paused);
        if self.next_tick.map_or(true, |next| next >= t) {
            self.next_tick = self.next_start_after(t);
        }
        debug!(time = t, "clock pause");
    }

    pub fn state_at(&self, time: f64) -> ClockState {
        self.state.value_at(time).unwrap_or(ClockState::Stopped)
    }

    /// Ticks handed out (or skipped) since the last stop.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Late ticks skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn next_tick(&self) -> Option<f64> {
        self.next_tick
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Every tick due up to `now + lookahead`, in time order.
    pub fn poll(&mut self, now: f64) -> Vec<Tick> {
        let horizon = now + self.lookahead;
        let mut due = Vec::new();

        while let Some(time) = self.next_tick {
            if time > horizon {
                break;
            }

            match self.state_at(time) {
                ClockState::Started => {}
                state => {
                    if state == ClockState::Stopped {
                        self.rewind();
                    }
                    self.next_tick = self.next_start_after(time);
                    continue;
                }
            }

            self.next_tick = Some(time + self.period_at(time));

            if time < now - self.tolerance {
                self.ticks += 1;
                self.skipped += 1;
                debug!(time, now, "skipping late tick");
                continue;
            }

            if let Some(tick) = self.accept(time) {
                due.push(tick);
            }
        }

        due
    }

    /// Feed a tick from an external scheduler. It goes through the same
    /// spurious-tick guard as generated ones.
    pub fn tick_at(&mut self, time: f64) -> Option<Tick> {
        if self.state_at(time) != ClockState::Started {
            return None;
        }
        self.accept(time)
    }

    fn accept(&mut self, time: f64) -> Option<Tick> {
        if let Some(prev) = self.prev_tick {
            let elapsed = time - prev;
            if elapsed - self.period_at(prev) <= -self.tolerance {
                debug!(time, elapsed, "dropping spurious tick");
                return None;
            }
        }

        let tick = Tick {
            time,
            index: self.ticks,
        };
        self.prev_tick = Some(time);
        self.ticks += 1;
        trace!(time, index = tick.index, "tick");
        Some(tick)
    }

    fn rewind(&mut self) {
        self.ticks = 0;
        self.prev_tick = None;
    }

    fn next_start_after(&self, time: f64) -> Option<f64> {
        self.state
            .iter()
            .find(|event| event.time > time && event.value == ClockState::Started)
            .map(|event| event.time)
    }
}

fn check_frequency(frequency: f64) -> Result<f64> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(frequency)
    } else {
        Err(Error::InvalidFrequency(frequency))
    }
}
