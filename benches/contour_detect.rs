use criterion::{Criterion, black_box, criterion_group, criterion_main};
use doc_scan::detector::edges::canny;
use doc_scan::utils::filter::gaussian_blur;
use doc_scan::utils::grayscale::frame_to_grayscale;
use doc_scan::{ContourOptions, detect_contour};

mod common;

fn bench_detect_medium(c: &mut Criterion) {
    let frame = common::synthetic_page(640, 480);
    let options = ContourOptions::default();
    c.bench_function("detect_contour_640x480", |b| {
        b.iter(|| detect_contour(black_box(&frame), black_box(&options)))
    });
}

fn bench_detect_large(c: &mut Criterion) {
    let frame = common::synthetic_page(1920, 1080);
    let options = ContourOptions::default();
    c.bench_function("detect_contour_1920x1080", |b| {
        b.iter(|| detect_contour(black_box(&frame), black_box(&options)))
    });
}

fn bench_canny_medium(c: &mut Criterion) {
    let frame = common::synthetic_page(640, 480);
    let gray = gaussian_blur(&frame_to_grayscale(&frame), 640, 480, 5);
    c.bench_function("canny_640x480", |b| {
        b.iter(|| canny(black_box(&gray), 640, 480, 30.0, 100.0))
    });
}

fn bench_detect_dataset(c: &mut Criterion) {
    let Some(frame) = common::first_dataset_frame() else {
        return;
    };
    let options = ContourOptions::default();
    c.bench_function("detect_contour_dataset_first", |b| {
        b.iter(|| detect_contour(black_box(&frame), black_box(&options)))
    });
}

criterion_group!(
    benches,
    bench_detect_medium,
    bench_detect_large,
    bench_canny_medium,
    bench_detect_dataset
);
criterion_main!(benches);
