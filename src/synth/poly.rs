use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::{
    dsp::{automation::RampShape, timeline::Timeline},
    engine::{registry::SoundId, AudioContext},
    error::{check_offset, check_range, Error, Result},
    graph::node::{Destination, NodeId, ParamId, ParamKind},
    sequencing::notes::{Note, NoteKey},
    synth::{
        factory::VoiceFactory,
        message::{MessageReceiver, SynthMessage},
        voice::Voice,
    },
};

/*
Polyphonic Voice Allocation
===========================

A fixed pool of monophonic voices, handed out per note.

            note_attack(C4) ──┐
            note_attack(E4) ──┼──▶ PolySynth ──▶ [ voice 0 | voice 1 | ... | voice N-1 ]
            note_release(C4) ─┘                            │
                                                           ▼
                                                        output ──▶ destination

Everything here is scheduled for a time, not performed "now". A burst of
calls can target different future offsets, and a call made later may target
an earlier time than one made before it. So the bookkeeping is time-indexed:

  notes          NoteKey → Timeline<Option<Assignment>>   slot and allocation order at T
  voices_in_use  Timeline<usize>                          how many notes sound at T

Attacking a note at T sets `in_use(T) + 1` at T and then adds one to every
change already scheduled after T, since the new note is sounding during all
of them. Releasing does the inverse (never below zero).

That walk only holds if the note itself has nothing scheduled after T. So
before a note is attacked or released at T, its own later events are dropped
(its voice curve after T is about to be rewritten anyway) and the occupancy
from the first dropped event onward is recounted from the note timelines.

Slot choice
-----------

  in_use(T) < N   first slot with no note at T, scanning from in_use(T)
  in_use(T) == N  steal the slot of the note allocated earliest among those
                  sounding at T (start time, then call order), releasing it at T

Stealing is oldest-wins. It is not an error; a full pool is the normal way
notes get recycled.

Velocity is capped at `2 / in_use(T)` so a full pool cannot sum to an
unbounded level.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Assignment {
    slot: usize,
    order: u64,
}

type NoteMap = HashMap<NoteKey, Timeline<Option<Assignment>>>;

pub struct PolySynth<V: Voice> {
    voices: Vec<V>,
    notes: NoteMap,
    voices_in_use: Timeline<usize>,
    allocations: u64,
    oldest: usize,
    newest: usize,
    evictions: u64,
    output: NodeId,
    sound: Option<SoundId>,
}

impl<V: Voice> PolySynth<V> {
    pub fn new<F>(ctx: &mut AudioContext, max_voices: usize, factory: F) -> Result<Self>
    where
        F: VoiceFactory<Voice = V>,
    {
        if max_voices == 0 {
            return Err(Error::EmptyVoicePool);
        }

        let destination = ctx.destination();
        let output = ctx.graph_mut().create_gain(1.0);
        ctx.graph_mut().connect(output, destination)?;

        let mut voices = Vec::with_capacity(max_voices);
        for _ in 0..max_voices {
            let mut voice = factory.create_voice(ctx)?;
            voice.disconnect(ctx);
            voice.connect(ctx, output.into())?;
            voices.push(voice);
        }

        let sound = ctx.register("poly_synth", vec![output]);
        debug!(max_voices, "created poly synth");

        Ok(Self {
            voices,
            notes: HashMap::new(),
            voices_in_use: Timeline::new(),
            allocations: 0,
            oldest: 0,
            newest: 0,
            evictions: 0,
            output,
            sound: Some(sound),
        })
    }

    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, slot: usize) -> Option<&V> {
        self.voices.get(slot)
    }

    pub fn voices(&self) -> &[V] {
        &self.voices
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Slot of the earliest-allocated note still sounding at the last attack.
    pub fn oldest(&self) -> usize {
        self.oldest
    }

    /// Slot most recently handed out.
    pub fn newest(&self) -> usize {
        self.newest
    }

    /// Notes stolen from a full pool so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Start `note` on a pool slot. Returns the slot.
    pub fn note_attack(
        &mut self,
        ctx: &mut AudioContext,
        note: impl Into<Note>,
        velocity: f32,
        time_from_now: f64,
    ) -> Result<usize> {
        let note = note.into();
        let key = note.key()?;
        let velocity = check_range("velocity", velocity as f64, 0.0, 1.0)? as f32;
        let t = ctx.time_from_now(time_from_now)?;
        let n = self.voices.len();

        self.drop_pending(key, t);
        if self.slot_for(key, t).is_some() {
            self.release_key(ctx, key, t)?;
        }

        let in_use = self.voices_in_use_at(t);
        let slot = if in_use < n {
            (0..n)
                .map(|i| (in_use + i) % n)
                .find(|slot| self.note_on_slot(*slot, t).is_none())
                .unwrap_or(in_use % n)
        } else {
            let slot = self.oldest_at(t).unwrap_or(self.oldest);
            if let Some(victim) = self.note_on_slot(slot, t) {
                debug!(slot, time = t, "voice pool full, stealing oldest voice");
                self.release_key(ctx, victim, t)?;
                self.evictions += 1;
            }
            slot
        };

        let order = self.allocations;
        self.allocations += 1;
        self.notes
            .entry(key)
            .or_default()
            .add(t, Some(Assignment { slot, order }));

        let count = self.voices_in_use_at(t) + 1;
        self.voices_in_use.add(t, count);
        self.voices_in_use.update_after(t, |c| *c += 1);
        self.oldest = self.oldest_at(t).unwrap_or(slot);
        self.newest = slot;

        let velocity = velocity.min(2.0 / count as f32);
        let offset = (t - ctx.current_time()).max(0.0);
        trace!(slot, time = t, velocity, "note attack");
        self.voices[slot].trigger_attack(ctx, note, velocity, offset)?;
        Ok(slot)
    }

    /// Release `note` at the given offset. Returns `false` (and logs) when the
    /// note is not sounding at that time.
    pub fn note_release(
        &mut self,
        ctx: &mut AudioContext,
        note: impl Into<Note>,
        time_from_now: f64,
    ) -> Result<bool> {
        let key = note.into().key()?;
        let t = ctx.time_from_now(time_from_now)?;
        self.release_key(ctx, key, t)
    }

    /// Release every voice and forget every note (all notes off).
    pub fn release_all(&mut self, ctx: &mut AudioContext, time_from_now: f64) -> Result<()> {
        let t = ctx.time_from_now(time_from_now)?;
        for voice in &mut self.voices {
            voice.trigger_release(ctx, time_from_now)?;
        }

        self.voices_in_use.cancel(t);
        self.voices_in_use.add(t, 0);
        self.notes.clear();
        self.allocations = 0;
        self.oldest = 0;
        self.newest = 0;
        debug!(time = t, "released all voices");
        Ok(())
    }

    /// Attack now (plus offset) and release `sustain` seconds later.
    pub fn play(
        &mut self,
        ctx: &mut AudioContext,
        note: impl Into<Note>,
        velocity: f32,
        time_from_now: f64,
        sustain: Option<f64>,
    ) -> Result<usize> {
        let note = note.into();
        let sustain = check_offset(sustain.unwrap_or(ctx.config().default_sustain))?;
        let slot = self.note_attack(ctx, note, velocity, time_from_now)?;
        self.note_release(ctx, note, time_from_now + sustain)?;
        Ok(slot)
    }

    pub fn set_adsr(&mut self, attack: f64, decay: f64, sustain: f32, release: f64) -> Result<()> {
        for voice in &mut self.voices {
            voice.set_adsr(attack, decay, sustain, release)?;
        }
        Ok(())
    }

    /// Ramp the synth's overall output level.
    pub fn amp(&mut self, ctx: &mut AudioContext, volume: f32, ramp_time: f64) -> Result<()> {
        check_range("volume", volume as f64, 0.0, f32::MAX as f64)?;
        let now = ctx.current_time();
        let end = ctx.time_from_now(ramp_time)?;
        let param = ctx
            .graph_mut()
            .param_mut(ParamId::new(self.output, ParamKind::Gain))?;
        param.hold_at(now, RampShape::Linear);
        param.linear_ramp_to_value_at_time(volume, end);
        Ok(())
    }

    pub fn connect(&mut self, ctx: &mut AudioContext, destination: Destination) -> Result<()> {
        ctx.graph_mut().connect(self.output, destination)
    }

    pub fn disconnect(&mut self, ctx: &mut AudioContext) {
        ctx.graph_mut().disconnect(self.output);
    }

    /// Slot assigned to `note` at absolute time `time`.
    pub fn slot_at(&self, note: impl Into<Note>, time: f64) -> Option<usize> {
        note.into().key().ok().and_then(|key| self.slot_for(key, time))
    }

    pub fn is_note_active(&self, note: impl Into<Note>, time: f64) -> bool {
        self.slot_at(note, time).is_some()
    }

    pub fn voices_in_use_at(&self, time: f64) -> usize {
        self.voices_in_use.value_at(time).unwrap_or(0)
    }

    /// Scheduled occupancy changes, in time order.
    pub fn occupancy(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.voices_in_use.iter().map(|e| (e.time, e.value))
    }

    /// Drop bookkeeping that can no longer affect anything at or after `now`.
    pub fn prune(&mut self, now: f64) {
        self.voices_in_use.forget_before(now);
        self.notes.retain(|_, timeline| {
            timeline.forget_before(now);
            !(timeline.len() == 1
                && timeline.last().is_some_and(|e| e.time <= now && e.value.is_none()))
        });
    }

    /// Drain queued note requests. Returns how many were handled.
    pub fn process_messages(
        &mut self,
        ctx: &mut AudioContext,
        rx: &mut impl MessageReceiver,
    ) -> Result<usize> {
        let mut handled = 0;
        while let Some(msg) = rx.pop() {
            match msg {
                SynthMessage::NoteOn {
                    note,
                    velocity,
                    time_from_now,
                } => {
                    self.note_attack(ctx, note, velocity, time_from_now)?;
                }
                SynthMessage::NoteOff {
                    note,
                    time_from_now,
                } => {
                    self.note_release(ctx, note, time_from_now)?;
                }
                SynthMessage::AllNotesOff => self.release_all(ctx, 0.0)?,
            }
            handled += 1;
        }
        Ok(handled)
    }

    /// Dispose every voice and the output stage. Safe to call twice.
    pub fn dispose(&mut self, ctx: &mut AudioContext) {
        for voice in &mut self.voices {
            voice.dispose(ctx);
        }
        if let Some(sound) = self.sound.take() {
            ctx.release(sound);
        }
        self.notes.clear();
        self.voices_in_use.clear();
    }

    fn slot_for(&self, key: NoteKey, time: f64) -> Option<usize> {
        self.notes
            .get(&key)
            .and_then(|t| t.value_at(time))
            .flatten()
            .map(|held| held.slot)
    }

    fn note_on_slot(&self, slot: usize, time: f64) -> Option<NoteKey> {
        self.notes
            .iter()
            .find(|(_, timeline)| {
                timeline.value_at(time).flatten().map(|held| held.slot) == Some(slot)
            })
            .map(|(key, _)| *key)
    }

    /// Slot of the sounding note that started first, ties broken by call order.
    fn oldest_at(&self, time: f64) -> Option<usize> {
        self.notes
            .values()
            .filter_map(|timeline| timeline.event_at(time))
            .filter_map(|event| event.value.map(|held| (event.time, held)))
            .min_by(|(a_time, a), (b_time, b)| {
                a_time.total_cmp(b_time).then(a.order.cmp(&b.order))
            })
            .map(|(_, held)| held.slot)
    }

    /// Forget whatever `key` had scheduled after `time` and recount occupancy.
    fn drop_pending(&mut self, key: NoteKey, time: f64) {
        let Some(timeline) = self.notes.get_mut(&key) else {
            return;
        };
        let stale = timeline.cancel_after(time);
        let Some(first) = stale.first() else {
            return;
        };

        trace!(
            dropped = stale.len(),
            from = first.time,
            "rescheduled note drops its later events"
        );
        let notes = &self.notes;
        self.voices_in_use
            .update_each_from(first.time, |at, count| *count = active_at(notes, at));
    }

    fn release_key(&mut self, ctx: &mut AudioContext, key: NoteKey, t: f64) -> Result<bool> {
        let Some(slot) = self.slot_for(key, t) else {
            warn!(
                frequency = key.frequency(),
                time = t,
                "note release for a note that is not sounding"
            );
            return Ok(false);
        };

        self.drop_pending(key, t);
        self.notes.entry(key).or_default().add(t, None);

        let count = self.voices_in_use_at(t).saturating_sub(1);
        self.voices_in_use.add(t, count);
        self.voices_in_use
            .update_after(t, |c| *c = c.saturating_sub(1));

        let offset = (t - ctx.current_time()).max(0.0);
        trace!(slot, time = t, "note release");
        self.voices[slot].trigger_release(ctx, offset)?;
        Ok(true)
    }
}

fn active_at(notes: &NoteMap, time: f64) -> usize {
    notes
        .values()
        .filter(|timeline| timeline.value_at(time).flatten().is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::mono::MonoSynth;

    fn synth(ctx: &mut AudioContext, voices: usize) -> PolySynth<MonoSynth> {
        PolySynth::new(ctx, voices, MonoSynth::new).unwrap()
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut ctx = AudioContext::default();
        assert!(matches!(
            PolySynth::new(&mut ctx, 0, MonoSynth::new),
            Err(Error::EmptyVoicePool)
        ));
    }

    #[test]
    fn full_pool_steals_oldest() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);

        assert_eq!(poly.note_attack(&mut ctx, 60u8, 0.5, 0.0).unwrap(), 0);
        assert_eq!(poly.note_attack(&mut ctx, 64u8, 0.5, 0.0).unwrap(), 1);
        assert_eq!(poly.note_attack(&mut ctx, 67u8, 0.5, 0.0).unwrap(), 0);

        assert!(!poly.is_note_active(60u8, 0.0));
        assert_eq!(poly.slot_at(64u8, 0.0), Some(1));
        assert_eq!(poly.slot_at(67u8, 0.0), Some(0));
        assert_eq!(poly.voices_in_use_at(0.0), 2);
        assert_eq!(poly.evictions(), 1);
        assert_eq!(poly.oldest(), 1);
    }

    #[test]
    fn steal_cursor_walks_the_whole_pool() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 3);
        for note in [60u8, 62, 64] {
            poly.note_attack(&mut ctx, note, 0.5, 0.0).unwrap();
        }

        let slots: Vec<usize> = [65u8, 67, 69, 71]
            .into_iter()
            .map(|note| poly.note_attack(&mut ctx, note, 0.5, 0.0).unwrap())
            .collect();

        assert_eq!(slots, vec![0, 1, 2, 0]);
    }

    #[test]
    fn steal_after_release_takes_earliest_allocation() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);

        assert_eq!(poly.note_attack(&mut ctx, 60u8, 0.5, 0.0).unwrap(), 0);
        assert_eq!(poly.note_attack(&mut ctx, 64u8, 0.5, 0.0).unwrap(), 1);
        assert_eq!(poly.note_release(&mut ctx, 60u8, 0.0), Ok(true));
        assert_eq!(poly.note_attack(&mut ctx, 67u8, 0.5, 0.0).unwrap(), 0);
        assert_eq!(poly.oldest(), 1);

        assert_eq!(poly.note_attack(&mut ctx, 69u8, 0.5, 0.0).unwrap(), 1);

        assert!(!poly.is_note_active(64u8, 0.0));
        assert_eq!(poly.slot_at(67u8, 0.0), Some(0));
        assert_eq!(poly.slot_at(69u8, 0.0), Some(1));
        assert_eq!(poly.voices_in_use_at(0.0), 2);
        assert_eq!(poly.oldest(), 0);
    }

    #[test]
    fn reattack_before_scheduled_release_keeps_note_booked() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 4);

        poly.play(&mut ctx, 60u8, 0.5, 0.0, Some(1.0)).unwrap();
        poly.note_attack(&mut ctx, 60u8, 0.5, 0.5).unwrap();

        assert!(poly.is_note_active(60u8, 2.0));
        assert_eq!(poly.voices_in_use_at(0.75), 1);
        assert_eq!(poly.voices_in_use_at(2.0), 1);

        assert_eq!(poly.note_release(&mut ctx, 60u8, 1.5), Ok(true));
        assert_eq!(poly.voices_in_use_at(1.0), 1);
        assert_eq!(poly.voices_in_use_at(2.0), 0);
        assert!(!poly.is_note_active(60u8, 2.0));
    }

    #[test]
    fn earlier_release_replaces_a_later_one() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);

        poly.play(&mut ctx, 60u8, 0.5, 0.0, Some(1.0)).unwrap();
        poly.note_attack(&mut ctx, 64u8, 0.5, 0.2).unwrap();
        assert_eq!(poly.note_release(&mut ctx, 60u8, 0.5), Ok(true));

        assert_eq!(poly.voices_in_use_at(0.5), 1);
        assert_eq!(poly.voices_in_use_at(1.0), 1);
        assert_eq!(poly.voices_in_use_at(2.0), 1);
    }

    #[test]
    fn reattacking_same_note_does_not_double_book() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 4);

        poly.note_attack(&mut ctx, Note::Freq(440.0), 0.5, 0.0).unwrap();
        poly.note_attack(&mut ctx, "A4".parse::<Note>().unwrap(), 0.5, 0.1)
            .unwrap();

        assert_eq!(poly.voices_in_use_at(0.1), 1);
    }

    #[test]
    fn future_attack_shifts_later_counts() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 4);

        poly.note_attack(&mut ctx, 60u8, 0.5, 2.0).unwrap();
        poly.note_attack(&mut ctx, 64u8, 0.5, 1.0).unwrap();

        assert_eq!(poly.voices_in_use_at(0.5), 0);
        assert_eq!(poly.voices_in_use_at(1.0), 1);
        assert_eq!(poly.voices_in_use_at(2.0), 2);
    }

    #[test]
    fn release_of_idle_note_is_a_noop() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);

        assert_eq!(poly.note_release(&mut ctx, 60u8, 0.0), Ok(false));
        assert_eq!(poly.voices_in_use_at(0.0), 0);
    }

    #[test]
    fn velocity_is_capped_by_occupancy() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 4);
        for note in [60u8, 64, 67] {
            poly.note_attack(&mut ctx, note, 1.0, 0.0).unwrap();
        }

        // third voice: 2 / 3
        let peak = poly.voice(2).unwrap().envelope().attack_level();
        assert!((peak - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn release_all_resets_bookkeeping() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);
        poly.note_attack(&mut ctx, 60u8, 0.5, 0.0).unwrap();
        poly.note_attack(&mut ctx, 64u8, 0.5, 0.5).unwrap();

        poly.release_all(&mut ctx, 0.0).unwrap();

        assert_eq!(poly.voices_in_use_at(1.0), 0);
        assert!(!poly.is_note_active(60u8, 0.0));
        assert!(poly
            .voices()
            .iter()
            .all(|voice| !voice.envelope().was_triggered()));
    }

    #[test]
    fn prune_forgets_finished_notes() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);
        poly.play(&mut ctx, 60u8, 0.5, 0.0, Some(0.2)).unwrap();

        ctx.advance_to(1.0);
        poly.prune(ctx.current_time());

        assert!(poly.notes.is_empty());
        assert_eq!(poly.occupancy().count(), 1);
    }

    #[test]
    fn queued_messages_are_applied_in_order() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 2);
        let mut queue = std::collections::VecDeque::from(vec![
            SynthMessage::NoteOn {
                note: Note::Midi(60),
                velocity: 0.5,
                time_from_now: 0.0,
            },
            SynthMessage::NoteOff {
                note: Note::Midi(60),
                time_from_now: 0.5,
            },
        ]);

        assert_eq!(poly.process_messages(&mut ctx, &mut queue), Ok(2));
        assert!(poly.is_note_active(60u8, 0.25));
        assert!(!poly.is_note_active(60u8, 0.5));
    }

    #[test]
    fn dispose_tears_down_every_voice() {
        let mut ctx = AudioContext::default();
        let mut poly = synth(&mut ctx, 3);

        poly.dispose(&mut ctx);
        poly.dispose(&mut ctx);

        assert!(ctx.registry().is_empty());
        assert_eq!(ctx.graph().len(), 1);
    }
}
