//! Benchmarks for realistic host workloads.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_sound::{
    sequencing::{Duration, Part, Phrase, Score},
    synth::{MonoSynth, PolySynth},
    AudioContext, TimeBase,
};

use crate::BLOCK_SIZES;

pub fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/allocator");

    // Chords landing on a pool smaller than the chord, so most attacks steal.
    for voices in [4, 16] {
        group.bench_with_input(BenchmarkId::new("steal_burst", voices), &voices, |b, &n| {
            b.iter(|| {
                let mut ctx = AudioContext::default();
                let mut poly = PolySynth::new(&mut ctx, n, MonoSynth::new).expect("pool");
                for i in 0..128u32 {
                    let note = 40 + (i * 7 % 36) as u8;
                    let t = (i / 6) as f64 * 0.05;
                    let _ = poly.note_attack(&mut ctx, note, 0.6, t);
                    let _ = poly.note_release(&mut ctx, note, t + 0.4);
                }
                black_box(poly.evictions())
            })
        });
    }

    group.finish();
}

struct Host {
    ctx: AudioContext,
    synth: PolySynth<MonoSynth>,
}

impl TimeBase for Host {
    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }
}

fn part(notes: Vec<f32>) -> Part<Host> {
    let mut part = Part::new(0, Duration::SIXTEENTH).expect("part");
    part.add_phrase(Phrase::new(
        "notes",
        |host: &mut Host, offset, note| {
            let Host { ctx, synth } = host;
            let _ = synth.play(ctx, note as u8, 0.5, offset, Some(0.1));
        },
        notes,
    ));
    part
}

pub fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/score");

    for &size in BLOCK_SIZES {
        // Four seconds of a two-part score, processed one block at a time.
        group.bench_with_input(BenchmarkId::new("process", size), &size, |b, &size| {
            b.iter(|| {
                let mut ctx = AudioContext::default();
                let synth = PolySynth::new(&mut ctx, 8, MonoSynth::new).expect("pool");
                let mut host = Host { ctx, synth };
                let mut score = Score::new(vec![
                    part(vec![60.0, 0.0, 64.0, 67.0, 0.0, 72.0, 67.0, 64.0]),
                    part(vec![48.0, 55.0, 0.0, 48.0]),
                ]);
                let _ = score.loop_score(&host, 0.0);
                while host.current_time() < 4.0 {
                    score.process(&mut host);
                    host.ctx.advance(size);
                    let now = host.current_time();
                    host.synth.prune(now);
                }
                black_box(host.synth.evictions())
            })
        });
    }

    group.finish();
}
