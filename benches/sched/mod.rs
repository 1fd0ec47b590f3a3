//! Benchmarks for the low-level scheduling primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_sound::{
    dsp::{AudioParam, RampShape},
    graph::{Destination, ParamId, ParamKind},
    sequencing::Clock,
    synth::Envelope,
    AudioContext,
};

use crate::BLOCK_SIZES;

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("sched/automation");

    // A param with a long tail of ramps, read at one point per sample.
    for events in [16, 256] {
        let mut param = AudioParam::new(0.0);
        for i in 0..events {
            let t = i as f64 * 0.01;
            param.linear_ramp_to_value_at_time((i % 7) as f32 / 7.0, t);
        }
        let span = events as f64 * 0.01;

        group.bench_with_input(BenchmarkId::new("value_at", events), &events, |b, _| {
            b.iter(|| {
                let mut sum = 0.0;
                for i in 0..512 {
                    sum += param.value_at(black_box(i as f64 / 512.0 * span));
                }
                black_box(sum)
            })
        });
    }

    group.bench_function("hold_at", |b| {
        b.iter(|| {
            let mut param = AudioParam::new(0.0);
            for i in 0..64 {
                let t = i as f64 * 0.05;
                param.hold_at(t, RampShape::Linear);
                param.linear_ramp_to_value_at_time(1.0, t + 0.1);
            }
            black_box(param.scheduled_len())
        })
    });

    group.finish();
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("sched/envelope");

    // Fast retriggers cut every stage short, so each one anchors mid-ramp.
    group.bench_function("retrigger", |b| {
        b.iter(|| {
            let mut ctx = AudioContext::default();
            let amp = ctx.graph_mut().create_gain(0.0);
            let target = Destination::Param(ParamId::new(amp, ParamKind::Gain));
            let mut env = Envelope::new(&mut ctx).expect("envelope");
            let _ = env.set_adsr(0.05, 0.1, 0.5, 0.2);
            let _ = env.connect(&mut ctx, target);
            for i in 0..32 {
                let t = i as f64 * 0.03;
                let _ = env.trigger_attack(&mut ctx, None, t);
                let _ = env.trigger_release(&mut ctx, None, t + 0.02);
            }
            black_box(env.level_at(&ctx, 0.5))
        })
    });

    group.finish();
}

pub fn bench_clock(c: &mut Criterion) {
    let mut group = c.benchmark_group("sched/clock");

    for &size in BLOCK_SIZES {
        let block = size as f64 / 48_000.0;

        // Ten seconds of sixteenths at 120 bpm, polled once per block.
        group.bench_with_input(BenchmarkId::new("poll", size), &size, |b, _| {
            b.iter(|| {
                let ctx = AudioContext::default();
                let mut clock = Clock::new(8.0).expect("valid frequency");
                let _ = clock.start(&ctx, 0.0);
                let mut ticks = 0;
                let mut now = 0.0;
                while now < 10.0 {
                    ticks += clock.poll(black_box(now)).len();
                    now += block;
                }
                black_box(ticks)
            })
        });
    }

    group.finish();
}
