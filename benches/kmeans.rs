use std::time::Duration;

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, Bencher, BenchmarkId, Criterion,
    SamplingMode,
};
use palette::Srgb;
use palettize::{kmeans, ClusterConfig, PixelSlice};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

fn synthetic_pixels(len: usize, seed: u64) -> Vec<Srgb<u8>> {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    (0..len)
        .map(|_| Srgb::new(rng.gen(), rng.gen(), rng.gen()))
        .collect()
}

fn bench(
    c: &mut Criterion,
    group: &str,
    mut f: impl FnMut(&mut Bencher<WallTime>, &(u16, Vec<Srgb<u8>>)),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(30)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_millis(500));

    for k in [4u16, 8, 16] {
        group.measurement_time(Duration::from_secs(3));
        for len in [112 * 112, 256 * 256] {
            let pixels = synthetic_pixels(len, 42);
            group.bench_with_input(BenchmarkId::new(k.to_string(), len), &(k, pixels), &mut f);
        }
    }
}

fn kmeans_palette_single(c: &mut Criterion) {
    bench(c, "kmeans_palette_single", |b, (k, pixels)| {
        let pixels = PixelSlice::from_truncated(pixels);
        let config = ClusterConfig::new(*k, *k, 1.0).unwrap();
        b.iter(|| kmeans::cluster(pixels, &config, 0));
    });
}

fn kmeans_palette_par(c: &mut Criterion) {
    bench(c, "kmeans_palette_par", |b, (k, pixels)| {
        let pixels = PixelSlice::from_truncated(pixels);
        let config = ClusterConfig::new(*k, *k, 1.0).unwrap();
        b.iter(|| kmeans::cluster_par(pixels, &config, 0));
    });
}

criterion_group!(benches, kmeans_palette_single, kmeans_palette_par);
criterion_main!(benches);
