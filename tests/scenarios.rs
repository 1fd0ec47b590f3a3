use std::sync::{Arc, Mutex};

use saavy_sound::{
    graph::{Destination, ParamId, ParamKind},
    sequencing::{Duration, Part, Phrase, Score, StepOutcome},
    synth::{Envelope, MonoSynth, PolySynth},
    AudioContext, TimeBase,
};

struct Clock(f64);

impl TimeBase for Clock {
    fn current_time(&self) -> f64 {
        self.0
    }
}

#[test]
fn third_note_on_two_voice_pool_steals_oldest() {
    let mut ctx = AudioContext::default();
    let mut poly = PolySynth::new(&mut ctx, 2, MonoSynth::new).unwrap();

    let a = poly.note_attack(&mut ctx, 60_u8, 0.5, 0.0).unwrap();
    let b = poly.note_attack(&mut ctx, 64_u8, 0.5, 0.0).unwrap();
    let c = poly.note_attack(&mut ctx, 67_u8, 0.5, 0.0).unwrap();

    assert_ne!(a, b);
    assert_eq!(c, a, "the oldest slot is reused");
    assert!(!poly.is_note_active(60_u8, 0.0));
    assert_eq!(poly.slot_at(64_u8, 0.0), Some(b));
    assert_eq!(poly.slot_at(67_u8, 0.0), Some(c));
    assert_eq!(poly.voices_in_use_at(0.0), 2);
    assert_eq!(poly.evictions(), 1);
}

#[test]
fn release_mid_attack_is_continuous() {
    let mut ctx = AudioContext::default();
    let amp = ctx.graph_mut().create_gain(0.0);
    let target = Destination::Param(ParamId::new(amp, ParamKind::Gain));
    let mut env = Envelope::new(&mut ctx).unwrap();
    env.set_adsr(0.1, 0.2, 0.5, 0.3).unwrap();

    env.trigger_attack(&mut ctx, Some(target), 0.0).unwrap();
    env.trigger_release(&mut ctx, Some(target), 0.05).unwrap();

    let before = env.level_at(&ctx, 0.0499);
    let at = env.level_at(&ctx, 0.05);
    let after = env.level_at(&ctx, 0.0501);
    assert!((at - 0.5).abs() < 1e-4);
    assert!((before - at).abs() < 0.01);
    assert!((after - at).abs() < 0.01);
    assert!(after <= at, "release only falls from the anchor");
    assert!(env.level_at(&ctx, 0.35).abs() < 1e-4);
}

#[test]
fn looping_part_plays_rests_as_silence() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&hits);
    let mut clock = Clock(0.0);
    let mut part = Part::new(4, Duration::SIXTEENTH).unwrap();
    part.add_phrase(Phrase::new(
        "p",
        move |clock: &mut Clock, _, value| log.lock().unwrap().push((clock.0, value)),
        vec![1.0, 0.0, 2.0, 0.0],
    ));
    part.loop_part(&clock, 0.0).unwrap();

    for tick in 0..8 {
        let time = tick as f64;
        clock.0 = time;
        part.increment_step(&mut clock, time);
    }

    assert_eq!(
        *hits.lock().unwrap(),
        vec![(0.0, 1.0), (2.0, 2.0), (4.0, 1.0), (6.0, 2.0)]
    );
    assert!(part.is_playing());
}

#[test]
fn score_hands_over_after_single_step_part() {
    let clock = Clock(0.0);
    let parts = vec![
        Part::<Clock>::new(1, Duration::SIXTEENTH).unwrap(),
        Part::<Clock>::new(1, Duration::SIXTEENTH).unwrap(),
    ];
    let mut score = Score::new(parts);
    score.start(&clock, 0.0).unwrap();

    let outcome = score.increment_step(&mut Clock(0.0), 0.0);

    assert_eq!(outcome, StepOutcome::Ended);
    assert!(!score.part(0).unwrap().is_playing());
    assert!(score.part(1).unwrap().is_playing());
    assert_eq!(score.current_part(), 1);
    assert!(score.is_playing());
}

#[test]
fn score_drives_synth_from_the_audio_clock() {
    struct Host {
        ctx: AudioContext,
        synth: PolySynth<MonoSynth>,
    }

    impl TimeBase for Host {
        fn current_time(&self) -> f64 {
            self.ctx.current_time()
        }
    }

    let mut ctx = AudioContext::default();
    let synth = PolySynth::new(&mut ctx, 4, MonoSynth::new).unwrap();
    let mut host = Host { ctx, synth };

    let mut part = Part::new(0, Duration::SIXTEENTH).unwrap();
    part.add_phrase(Phrase::new(
        "notes",
        |host: &mut Host, offset, note| {
            host.synth
                .play(&mut host.ctx, note as u8, 0.5, offset, Some(0.1))
                .unwrap();
        },
        vec![60.0, 62.0, 64.0, 65.0],
    ));
    let mut score = Score::new(vec![part]);
    score.start(&host, 0.0).unwrap();

    let mut end = None;
    while host.ctx.current_time() < 2.0 && end.is_none() {
        end = score.process(&mut host);
        host.ctx.advance(512);
    }

    // 60 bpm sixteenths: ticks at 0, 0.25, 0.5, 0.75.
    assert_eq!(end, Some(0.75));
    assert!(host.synth.is_note_active(60_u8, 0.05));
    assert!(host.synth.is_note_active(65_u8, 0.8));
    assert!(!host.synth.is_note_active(65_u8, 0.9));
    assert_eq!(host.synth.voices_in_use_at(1.0), 0);
}
