use criterion::{Criterion, black_box, criterion_group, criterion_main};
use doc_scan::{Point, Quad, rectify};

mod common;

fn skewed_quad(width: f32, height: f32) -> Quad {
    Quad::new([
        Point::new(width * 0.12, height * 0.08),
        Point::new(width * 0.90, height * 0.11),
        Point::new(width * 0.86, height * 0.93),
        Point::new(width * 0.08, height * 0.88),
    ])
}

fn bench_rectify_medium(c: &mut Criterion) {
    let frame = common::synthetic_page(640, 480);
    let quad = skewed_quad(640.0, 480.0);
    c.bench_function("rectify_640x480", |b| {
        b.iter(|| rectify(black_box(&frame), black_box(&quad)))
    });
}

fn bench_rectify_large(c: &mut Criterion) {
    let frame = common::synthetic_page(1920, 1080);
    let quad = skewed_quad(1920.0, 1080.0);
    c.bench_function("rectify_1920x1080", |b| {
        b.iter(|| rectify(black_box(&frame), black_box(&quad)))
    });
}

criterion_group!(benches, bench_rectify_medium, bench_rectify_large);
criterion_main!(benches);
