use std::fmt;

use tracing::{debug, trace};

use crate::{
    config::EngineConfig,
    engine::TimeBase,
    error::{check_offset, Error, Result},
    sequencing::{
        clock::{Clock, Tick},
        duration::Duration,
        phrase::Phrase,
    },
};

/*
Part
====

A step sequencer driven by its own Clock. Each clock tick is one tatum.

  tick:        0    1    2    3    4    5    6    7
  part step:   0    1    2    3    0    1    2    3      (length 4, looping)
  phrase A:    1    .    2    .    1    .    2    .      [1, 0, 2, 0]
  phrase B:    x    .    .    x    .    .    x    .      [x, 0, 0]

The part's own step cursor counts through `length` and decides when the
part ends. Phrases do not follow that cursor: each plays
`sequence[tick % sequence.len()]`, so phrases of different lengths drift
against each other and against the part.

On the last step a looping part rewinds its cursor; a non-looping part
stops and reports `StepOutcome::Ended` (a Score uses that to hand over to the
next part). Phrases still play on that final tick.

Length is the longest phrase ever added. It grows when a longer phrase or
sequence arrives and never shrinks when one is removed.
*/

pub type StepCallback<S> = Box<dyn FnMut(&mut S, f64) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Advanced to the next step.
    Continued,
    /// Reached the last step and wrapped to the first.
    Looped,
    /// Reached the last step and stopped.
    Ended,
}

pub struct Part<S> {
    length: usize,
    part_step: usize,
    tick_count: u64,
    tatum: Duration,
    bpm: f64,
    clock: Clock,
    phrases: Vec<Phrase<S>>,
    looping: bool,
    playing: bool,
    on_step: Option<StepCallback<S>>,
    on_ended: Option<StepCallback<S>>,
}

impl<S: TimeBase> Part<S> {
    pub fn new(steps: usize, tatum: Duration) -> Result<Self> {
        Self::with_config(steps, tatum, &EngineConfig::default())
    }

    pub fn with_config(steps: usize, tatum: Duration, config: &EngineConfig) -> Result<Self> {
        let tatum = Duration::new(tatum.numerator, tatum.denominator)?;
        let bpm = config.default_bpm;
        Ok(Self {
            length: steps,
            part_step: 0,
            tick_count: 0,
            tatum,
            bpm,
            clock: Clock::with_config(tatum.ticks_per_second(bpm), config)?,
            phrases: Vec::new(),
            looping: false,
            playing: false,
            on_step: None,
            on_ended: None,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Position of the part's step cursor.
    pub fn step(&self) -> usize {
        self.part_step
    }

    /// Ticks played since the last stop.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tatum(&self) -> Duration {
        self.tatum
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn phrases(&self) -> &[Phrase<S>] {
        &self.phrases
    }

    /// Seconds between ticks at the current tempo.
    pub fn period(&self) -> f64 {
        self.tatum.seconds_at(self.bpm)
    }

    /// Change tempo, optionally gliding over `ramp_time` seconds.
    pub fn set_bpm(&mut self, time: &impl TimeBase, bpm: f64, ramp_time: f64) -> Result<()> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(Error::InvalidFrequency(bpm));
        }
        self.clock
            .set_frequency(time, self.tatum.ticks_per_second(bpm), ramp_time)?;
        self.bpm = bpm;
        Ok(())
    }

    /// Called on every step except the last, with seconds until the step.
    pub fn on_step(&mut self, callback: impl FnMut(&mut S, f64) + Send + 'static) {
        self.on_step = Some(Box::new(callback));
    }

    /// Called when a non-looping part plays its last step.
    pub fn on_ended(&mut self, callback: impl FnMut(&mut S, f64) + Send + 'static) {
        self.on_ended = Some(Box::new(callback));
    }

    /// Add (or replace, by name) a phrase. Grows the part to fit it.
    pub fn add_phrase(&mut self, phrase: Phrase<S>) {
        self.length = self.length.max(phrase.len());
        match self.phrases.iter_mut().find(|p| p.name() == phrase.name()) {
            Some(existing) => *existing = phrase,
            None => self.phrases.push(phrase),
        }
    }

    /// Remove a phrase by name. The part keeps its length.
    pub fn remove_phrase(&mut self, name: &str) -> Result<Phrase<S>> {
        let index = self
            .phrases
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| Error::PhraseNotFound(name.to_string()))?;
        Ok(self.phrases.remove(index))
    }

    pub fn get_phrase(&self, name: &str) -> Option<&Phrase<S>> {
        self.phrases.iter().find(|p| p.name() == name)
    }

    pub fn get_phrase_mut(&mut self, name: &str) -> Option<&mut Phrase<S>> {
        self.phrases.iter_mut().find(|p| p.name() == name)
    }

    /// Swap a phrase's sequence in place. Grows the part to fit it.
    pub fn replace_sequence(&mut self, name: &str, sequence: Vec<f32>) -> Result<()> {
        let phrase = self
            .get_phrase_mut(name)
            .ok_or_else(|| Error::PhraseNotFound(name.to_string()))?;
        phrase.set_sequence(sequence);
        let len = phrase.len();
        self.length = self.length.max(len);
        Ok(())
    }

    pub fn start(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let t = time.current_time() + check_offset(time_from_now)?;
        self.start_at(t);
        Ok(())
    }

    /// Start with looping on.
    pub fn loop_part(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        self.looping = true;
        self.start(time, time_from_now)
    }

    /// Play through once more, then stop.
    pub fn no_loop(&mut self) {
        self.looping = false;
    }

    /// Stop and rewind to the first step.
    pub fn stop(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let t = time.current_time() + check_offset(time_from_now)?;
        self.stop_at(t);
        Ok(())
    }

    /// Stop without rewinding.
    pub fn pause(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let t = time.current_time() + check_offset(time_from_now)?;
        self.playing = false;
        self.clock.pause_at(t);
        Ok(())
    }

    /// Rewind the part and its phrases without touching the transport.
    pub fn reset(&mut self) {
        self.part_step = 0;
        self.tick_count = 0;
        for phrase in &mut self.phrases {
            phrase.reset();
        }
    }

    pub(crate) fn start_at(&mut self, t: f64) {
        if !self.playing {
            self.playing = true;
            self.clock.start_at(t);
            debug!(time = t, length = self.length, "part start");
        }
    }

    pub(crate) fn stop_at(&mut self, t: f64) {
        self.playing = false;
        self.part_step = 0;
        self.tick_count = 0;
        self.clock.stop_at(t);
    }

    pub(crate) fn poll(&mut self, now: f64) -> Vec<Tick> {
        self.clock.poll(now)
    }

    /// Advance one tatum at audio time `time`.
    pub fn increment_step(&mut self, state: &mut S, time: f64) -> StepOutcome {
        let offset = (time - state.current_time()).max(0.0);
        let tick = self.tick_count;

        let outcome = if self.part_step + 1 < self.length {
            if let Some(callback) = self.on_step.as_mut() {
                callback(state, offset);
            }
            self.part_step += 1;
            StepOutcome::Continued
        } else if self.length == 0 {
            StepOutcome::Continued
        } else if self.looping {
            self.part_step = 0;
            StepOutcome::Looped
        } else {
            self.stop_at(time);
            if let Some(callback) = self.on_ended.as_mut() {
                callback(state, offset);
            }
            StepOutcome::Ended
        };

        for phrase in &mut self.phrases {
            phrase.play(state, tick, offset);
        }
        if outcome != StepOutcome::Ended {
            self.tick_count += 1;
        }

        trace!(time, tick, step = self.part_step, ?outcome, "part step");
        outcome
    }

    /// Play every tick due by now. Returns the end time if the part ended.
    pub fn process(&mut self, state: &mut S) -> Option<f64> {
        let now = state.current_time();
        for tick in self.poll(now) {
            if self.increment_step(state, tick.time) == StepOutcome::Ended {
                return Some(tick.time);
            }
        }
        None
    }
}

impl<S> fmt::Debug for Part<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("length", &self.length)
            .field("part_step", &self.part_step)
            .field("tick_count", &self.tick_count)
            .field("tatum", &self.tatum)
            .field("bpm", &self.bpm)
            .field("looping", &self.looping)
            .field("playing", &self.playing)
            .field("phrases", &self.phrases)
            .finish_non_exhaustive()
    }
}
