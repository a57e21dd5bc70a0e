//! Criterion benchmarks for the tonearm engine
//!
//! Run with: cargo bench -p tonearm-engine
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tonearm_config::{ModulationMode, RampConfig, find_room};
use tonearm_engine::{
    EffectParameterSet, GraphContext, GraphTopology, ImpulseResponse, Knob, OfflineJob,
    SignalGraph, render_offline,
};
use tonearm_io::DecodedAudio;

const SAMPLE_RATE: u32 = 44100;
const BLOCK_SIZES: &[usize] = &[128, 512, 2048];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn busy_params() -> EffectParameterSet {
    let mut params = EffectParameterSet::default();
    params.set(Knob::ReverbMix, 30.0);
    params.set(Knob::DelayMix, 20.0);
    params.set(Knob::ChorusMix, 20.0);
    params.set(Knob::PitchSemitones, 3.0);
    params.set(Knob::BassBoost, 40.0);
    params.set(Knob::Compressor, 50.0);
    params.set(Knob::EqBand(4), 6.0);
    params
}

fn context(room: &str) -> GraphContext {
    let room = find_room(room).unwrap();
    let ir = ImpulseResponse::synthesize(&room, SAMPLE_RATE, 1337);
    GraphContext::new(
        Arc::new(GraphTopology::standard(ModulationMode::Chorus)),
        Arc::new(ir.to_kernel(256)),
        RampConfig::default(),
        SAMPLE_RATE as f32,
    )
}

fn bench_signal_graph(c: &mut Criterion) {
    let ctx = context("room");
    let mut group = c.benchmark_group("SignalGraph");

    for (label, params) in [
        ("neutral", EffectParameterSet::default()),
        ("busy", busy_params()),
    ] {
        for &block_size in BLOCK_SIZES {
            let input = generate_test_signal(block_size);
            let mut graph = SignalGraph::new(&ctx, 1.0, params.values());
            group.bench_with_input(
                BenchmarkId::new(label, block_size),
                &block_size,
                |b, _| {
                    let mut left = input.clone();
                    let mut right = input.clone();
                    b.iter(|| {
                        graph.process(black_box(&mut left), black_box(&mut right), params.values());
                        black_box(left[0])
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_impulse_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("ImpulseResponse");
    group.sample_size(20);
    for name in ["small", "hall"] {
        let room = find_room(name).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(ImpulseResponse::synthesize(&room, SAMPLE_RATE, 1337).len()))
        });
    }
    group.finish();
}

fn bench_offline_render(c: &mut Criterion) {
    let ctx = context("small");
    let signal = generate_test_signal(SAMPLE_RATE as usize);
    let audio = DecodedAudio::from_planar(vec![signal.clone(), signal], SAMPLE_RATE)
        .unwrap()
        .into_shared();
    let job = OfflineJob {
        audio,
        topology: ctx.topology,
        kernel: ctx.kernel,
        knobs: *busy_params().values(),
        input_gain: 1.0,
        ramps: RampConfig::default(),
    };

    let mut group = c.benchmark_group("Offline");
    group.sample_size(10);
    group.bench_function("render_1s_stereo", |b| {
        b.iter(|| black_box(render_offline(&job, |_| {}).unwrap().len()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_signal_graph,
    bench_impulse_synthesis,
    bench_offline_render
);
criterion_main!(benches);
