use criterion::{black_box, criterion_group, criterion_main, Criterion};

use auscout::{LookupConfig, TrackIndex};

fn seeded_index(n_tracks: i64, track_len: usize) -> TrackIndex {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let mut index = TrackIndex::new();
    for id in 0..n_tracks {
        let frames: Vec<u32> = (0..track_len).map(|_| rng.u32(..)).collect();
        index.insert_track(id, &frames).expect("insert");
    }
    index
}

fn bench_lookup(c: &mut Criterion) {
    let index = seeded_index(1_000, 3_000);
    let cfg = LookupConfig::default();

    let target: Vec<u32> = index
        .track_frames(42)
        .expect("track exists")
        .map(|frame| frame.hash_value)
        .collect();
    let probe = target[100..600].to_vec();
    let zero_toggles = vec![0u32; probe.len()];
    let bit_toggles = vec![0x0000_000Fu32; probe.len()];

    c.bench_function("lookup_exact_500", |b| {
        b.iter(|| {
            index
                .lookup(black_box(&probe), &zero_toggles, 0.30, &cfg)
                .expect("lookup")
        })
    });

    c.bench_function("lookup_toggled_4bit_500", |b| {
        b.iter(|| {
            index
                .lookup(black_box(&probe), &bit_toggles, 0.30, &cfg)
                .expect("lookup")
        })
    });

    c.bench_function("lookup_miss_500", |b| {
        let miss: Vec<u32> = (0..500).map(|i| 0xF000_0000u32 | i).collect();
        b.iter(|| {
            index
                .lookup(black_box(&miss), &zero_toggles, 0.30, &cfg)
                .expect("lookup")
        })
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
