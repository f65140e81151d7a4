#[macro_use]
extern crate criterion;
extern crate mandelzoom;
extern crate num;

use criterion::Criterion;
use mandelzoom::{Camera, TiledRenderer};
use num::Complex;

fn bench_frame(c: &mut Criterion) {
    let camera = Camera {
        zoom: 0.8,
        offset: Complex::new(0.5, 0.1),
    };

    let mut solo = TiledRenderer::new(320, 180, 16, 64, 0).unwrap();
    let mut frame = vec![0u8; solo.frame_len()];
    c.bench_function("frame_320x180_solo", move |b| {
        b.iter(|| solo.render_frame(&camera, &mut frame).unwrap())
    });

    let mut pooled = TiledRenderer::new(320, 180, 16, 64, TiledRenderer::default_workers()).unwrap();
    let mut frame = vec![0u8; pooled.frame_len()];
    c.bench_function("frame_320x180_pooled", move |b| {
        b.iter(|| pooled.render_frame(&camera, &mut frame).unwrap())
    });
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
