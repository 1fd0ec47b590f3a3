use std::fmt;

use tracing::debug;

use crate::{
    engine::TimeBase,
    error::{Error, Result},
    sequencing::part::{Part, StepCallback, StepOutcome},
};

/// Parts played back to back.
///
/// When the current part ends, the score rewinds it and starts the next one
/// a single tatum after the last tick, so the hand-off is gapless. After the
/// last part the score either wraps to the first (looping) or stops.
pub struct Score<S> {
    parts: Vec<Part<S>>,
    current_part: usize,
    score_step: u64,
    looping: bool,
    playing: bool,
    on_ended: Option<StepCallback<S>>,
}

impl<S: TimeBase> Score<S> {
    pub fn new(parts: Vec<Part<S>>) -> Self {
        Self {
            parts,
            current_part: 0,
            score_step: 0,
            looping: false,
            playing: false,
            on_ended: None,
        }
    }

    pub fn parts(&self) -> &[Part<S>] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&Part<S>> {
        self.parts.get(index)
    }

    pub fn part_mut(&mut self, index: usize) -> Option<&mut Part<S>> {
        self.parts.get_mut(index)
    }

    pub fn current_part(&self) -> usize {
        self.current_part
    }

    /// Steps played since the score started.
    pub fn score_step(&self) -> u64 {
        self.score_step
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Called when a non-looping score finishes its last part.
    pub fn on_ended(&mut self, callback: impl FnMut(&mut S, f64) + Send + 'static) {
        self.on_ended = Some(Box::new(callback));
    }

    pub fn start(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        let Some(part) = self.parts.get_mut(self.current_part) else {
            return Ok(());
        };
        part.start(time, time_from_now)?;
        self.playing = true;
        Ok(())
    }

    pub fn stop(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        for part in &mut self.parts {
            part.stop(time, time_from_now)?;
        }
        self.current_part = 0;
        self.score_step = 0;
        self.playing = false;
        Ok(())
    }

    pub fn pause(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        if let Some(part) = self.parts.get_mut(self.current_part) {
            part.pause(time, time_from_now)?;
        }
        self.playing = false;
        Ok(())
    }

    pub fn loop_score(&mut self, time: &impl TimeBase, time_from_now: f64) -> Result<()> {
        self.looping = true;
        self.start(time, time_from_now)
    }

    pub fn no_loop(&mut self) {
        self.looping = false;
    }

    pub fn set_bpm(&mut self, time: &impl TimeBase, bpm: f64, ramp_time: f64) -> Result<()> {
        for part in &mut self.parts {
            part.set_bpm(time, bpm, ramp_time)?;
        }
        Ok(())
    }

    /// Rewind one part (and its phrases) without touching playback.
    pub fn reset_part(&mut self, index: usize) -> Result<()> {
        let len = self.parts.len();
        self.parts
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange {
                what: "parts",
                index,
                len,
            })?
            .reset();
        Ok(())
    }

    pub fn reset_parts(&mut self) {
        for part in &mut self.parts {
            part.reset();
        }
    }

    /// Step the current part at `time`, handing over if it ends.
    pub fn increment_step(&mut self, state: &mut S, time: f64) -> StepOutcome {
        let Some(part) = self.parts.get_mut(self.current_part) else {
            return StepOutcome::Continued;
        };
        let outcome = part.increment_step(state, time);
        self.score_step += 1;
        if outcome == StepOutcome::Ended {
            self.play_next_part(state, time);
        }
        outcome
    }

    /// Play every tick due by now, across hand-offs. Returns the end time if
    /// the score finished.
    pub fn process(&mut self, state: &mut S) -> Option<f64> {
        let now = state.current_time();
        while self.playing {
            let Some(part) = self.parts.get_mut(self.current_part) else {
                break;
            };
            let ticks = part.poll(now);

            let mut handed_off = false;
            for tick in ticks {
                if self.increment_step(state, tick.time) == StepOutcome::Ended {
                    if !self.playing {
                        return Some(tick.time);
                    }
                    handed_off = true;
                    break;
                }
            }
            if !handed_off {
                break;
            }
        }
        None
    }

    fn play_next_part(&mut self, state: &mut S, end_time: f64) {
        let finished = self.current_part;
        self.parts[finished].reset();

        let next = finished + 1;
        if next < self.parts.len() {
            self.current_part = next;
        } else if self.looping {
            self.current_part = 0;
            self.reset_parts();
        } else {
            self.current_part = 0;
            self.score_step = 0;
            self.playing = false;
            debug!(time = end_time, "score finished");
            if let Some(callback) = self.on_ended.as_mut() {
                let offset = (end_time - state.current_time()).max(0.0);
                callback(state, offset);
            }
            return;
        }

        let part = &mut self.parts[self.current_part];
        part.reset();
        let start = end_time + part.period();
        part.start_at(start);
        debug!(from = finished, to = self.current_part, time = start, "score hand-off");
    }
}

impl<S> fmt::Debug for Score<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Score")
            .field("parts", &self.parts)
            .field("current_part", &self.current_part)
            .field("score_step", &self.score_step)
            .field("looping", &self.looping)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}
