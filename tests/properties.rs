use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use saavy_sound::{
    graph::{Destination, ParamId, ParamKind},
    sequencing::{Duration, Part, Phrase},
    synth::{Envelope, MonoSynth, PolySynth, Voice},
    AudioContext, TimeBase,
};

#[derive(Default)]
struct Host {
    now: f64,
    tick: u64,
    hits: Vec<u64>,
}

impl TimeBase for Host {
    fn current_time(&self) -> f64 {
        self.now
    }
}

fn tatum_strategy() -> impl Strategy<Value = Duration> {
    prop_oneof![
        Just(Duration::QUARTER),
        Just(Duration::EIGHTH),
        Just(Duration::SIXTEENTH),
        Just(Duration::EIGHTH_TRIPLET),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pool_never_holds_more_than_its_size(
        voices in 1usize..6,
        attacks in prop::collection::vec((36u8..48, 0u8..3), 1..24),
    ) {
        let mut ctx = AudioContext::default();
        let mut poly = PolySynth::new(&mut ctx, voices, MonoSynth::new).unwrap();
        let mut played = HashSet::new();
        let mut time = 0.0;

        for (note, gap) in attacks {
            time += gap as f64 * 0.01;
            let before = poly.evictions();
            poly.note_attack(&mut ctx, note, 0.5, time).unwrap();
            played.insert(note);

            prop_assert!(poly.evictions() - before <= 1);

            let slots: Vec<usize> = played
                .iter()
                .filter_map(|n| poly.slot_at(*n, time))
                .collect();
            let distinct: HashSet<_> = slots.iter().collect();
            prop_assert!(slots.len() <= voices);
            prop_assert_eq!(distinct.len(), slots.len(), "two notes share a slot");
            prop_assert_eq!(poly.voices_in_use_at(time), slots.len());
        }
    }

    #[test]
    fn occupancy_and_eviction_follow_allocation_order(
        voices in 1usize..5,
        events in prop::collection::vec((any::<bool>(), 60u8..66, 0u8..3), 1..40),
    ) {
        let mut ctx = AudioContext::default();
        let mut poly = PolySynth::new(&mut ctx, voices, MonoSynth::new).unwrap();
        // pitch -> allocation number, for the notes that should be sounding
        let mut sounding: HashMap<u8, u64> = HashMap::new();
        let mut allocations = 0u64;
        let mut time = 0.0;

        for (attack, note, gap) in events {
            time += gap as f64 * 0.01;
            let before = poly.evictions();

            if attack {
                sounding.remove(&note);
                let victim = (sounding.len() == voices)
                    .then(|| sounding.iter().min_by_key(|(_, order)| **order).map(|(n, _)| *n))
                    .flatten();

                poly.note_attack(&mut ctx, note, 0.5, time).unwrap();

                if let Some(victim) = victim {
                    prop_assert_eq!(poly.evictions(), before + 1);
                    prop_assert!(!poly.is_note_active(victim, time), "evicted {} instead", victim);
                    sounding.remove(&victim);
                } else {
                    prop_assert_eq!(poly.evictions(), before);
                }
                sounding.insert(note, allocations);
                allocations += 1;
            } else {
                let was_sounding = sounding.remove(&note).is_some();
                prop_assert_eq!(poly.note_release(&mut ctx, note, time), Ok(was_sounding));
            }

            for pitch in 60u8..66 {
                prop_assert_eq!(poly.is_note_active(pitch, time), sounding.contains_key(&pitch));
            }
            prop_assert_eq!(poly.voices_in_use_at(time), sounding.len());

            let mut checked: Vec<f64> = poly.occupancy().map(|(at, _)| at).collect();
            checked.extend([time + 0.005, time + 1.0]);
            for at in checked {
                let active = (60u8..66).filter(|p| poly.is_note_active(*p, at)).count();
                prop_assert_eq!(poly.voices_in_use_at(at), active, "occupancy drifted at {}", at);
            }
        }
    }

    #[test]
    fn voices_in_use_returns_to_zero_after_bursts(
        voices in 1usize..6,
        count in 1usize..12,
        release_gaps in prop::collection::vec(1u8..50, 12),
    ) {
        let mut ctx = AudioContext::default();
        let mut poly = PolySynth::new(&mut ctx, voices, MonoSynth::new).unwrap();

        for i in 0..count {
            poly.note_attack(&mut ctx, 48 + i as u8, 0.8, i as f64 * 0.05).unwrap();
        }
        let last_attack = (count - 1) as f64 * 0.05;
        let mut last_release: f64 = 0.0;
        for i in 0..count {
            let at = last_attack + release_gaps[i] as f64 * 0.01;
            last_release = last_release.max(at);
            poly.note_release(&mut ctx, 48 + i as u8, at).unwrap();
        }

        prop_assert!(poly.occupancy().all(|(_, n)| n <= voices));
        prop_assert_eq!(poly.voices_in_use_at(last_release), 0);
        prop_assert_eq!(poly.voices_in_use_at(last_release + 1.0), 0);
    }

    #[test]
    fn rests_never_fire(
        sequence in prop::collection::vec(prop_oneof![Just(0.0f32), 1.0f32..100.0], 1..16),
        tatum in tatum_strategy(),
        ticks in 1u64..64,
    ) {
        let mut part = Part::new(0, tatum).unwrap();
        part.add_phrase(Phrase::new(
            "p",
            |host: &mut Host, _, _| {
                let tick = host.tick;
                host.hits.push(tick);
            },
            sequence.clone(),
        ));
        part.loop_part(&Host::default(), 0.0).unwrap();

        let mut host = Host::default();
        let period = part.period();
        for tick in 0..ticks {
            host.tick = tick;
            host.now = tick as f64 * period;
            let now = host.now;
            part.increment_step(&mut host, now);
        }

        let len = sequence.len() as u64;
        let expected: Vec<u64> = (0..ticks)
            .filter(|t| sequence[(t % len) as usize] != 0.0)
            .collect();
        prop_assert_eq!(host.hits, expected);
    }

    #[test]
    fn part_length_is_longest_phrase_ever_added(
        lengths in prop::collection::vec(1usize..32, 1..8),
    ) {
        let mut part: Part<Host> = Part::new(0, Duration::SIXTEENTH).unwrap();
        for (i, len) in lengths.iter().enumerate() {
            part.add_phrase(Phrase::new(format!("p{i}"), |_: &mut Host, _, _| {}, vec![1.0; *len]));
        }
        let longest = *lengths.iter().max().unwrap();
        prop_assert_eq!(part.length(), longest);

        let index = lengths.iter().position(|l| *l == longest).unwrap();
        part.remove_phrase(&format!("p{index}")).unwrap();
        prop_assert_eq!(part.length(), longest);
    }
}

#[test]
fn part_length_from_three_seven_five() {
    let mut part: Part<Host> = Part::new(0, Duration::SIXTEENTH).unwrap();
    for (name, len) in [("a", 3), ("b", 7), ("c", 5)] {
        part.add_phrase(Phrase::new(name, |_: &mut Host, _, _| {}, vec![1.0; len]));
    }
    assert_eq!(part.length(), 7);

    part.remove_phrase("b").unwrap();
    assert_eq!(part.length(), 7);
}

#[test]
fn double_release_schedules_nothing_new() {
    let mut ctx = AudioContext::default();
    let amp = ctx.graph_mut().create_gain(0.0);
    let target = Destination::Param(ParamId::new(amp, ParamKind::Gain));
    let mut env = Envelope::new(&mut ctx).unwrap();
    let control = ParamId::new(env.control().unwrap(), ParamKind::Offset);

    env.trigger_attack(&mut ctx, Some(target), 0.0).unwrap();
    env.trigger_release(&mut ctx, None, 0.5).unwrap();
    let scheduled = ctx.graph().param(control).unwrap().scheduled_len();

    env.trigger_release(&mut ctx, None, 0.7).unwrap();

    assert_eq!(ctx.graph().param(control).unwrap().scheduled_len(), scheduled);
    assert!(!env.was_triggered());
}

#[test]
fn played_note_is_silent_and_forgotten_after_release() {
    let mut ctx = AudioContext::default();
    let mut poly = PolySynth::new(&mut ctx, 3, MonoSynth::new).unwrap();
    let (start, sustain) = (0.2, 0.4);

    let slot = poly.play(&mut ctx, 69_u8, 0.9, start, Some(sustain)).unwrap();
    let voice = poly.voice(slot).unwrap();
    let silent_at = start + sustain + voice.release_time() + 0.01;

    assert!(poly.is_note_active(69_u8, start + 0.01));
    assert!(voice.level_at(&ctx, start + 0.05) > 0.0);
    assert!(voice.level_at(&ctx, silent_at) <= 1e-6);
    assert!(!poly.is_note_active(69_u8, silent_at));
    assert_eq!(poly.voices_in_use_at(silent_at), 0);
}
