use doc_scan::utils::geometry::PerspectiveTransform;
use doc_scan::{GeometryError, PerspectiveRectifier, Point, Quad, ScanError, rectify};

const DOC_W: f64 = 240.0;
const DOC_H: f64 = 160.0;

/// Linear colour ramp, exact under bilinear sampling
fn doc_color(x: f64, y: f64) -> [f64; 3] {
    [x / DOC_W * 255.0, y / DOC_H * 255.0, 128.0]
}

fn doc_corners() -> [Point; 4] {
    [
        Point::new(0.0, 0.0),
        Point::new(DOC_W as f32, 0.0),
        Point::new(DOC_W as f32, DOC_H as f32),
        Point::new(0.0, DOC_H as f32),
    ]
}

/// Project the ramp document into `quad` of a black `width x height` frame
fn photograph(width: usize, height: usize, quad: &Quad) -> doc_scan::Frame {
    let to_doc = PerspectiveTransform::from_points(quad.corners(), &doc_corners()).unwrap();
    let mut data = vec![0u8; width * height * 3];
    for y in 0..height {
        for x in 0..width {
            let Some((u, v)) = to_doc.apply(x as f64, y as f64) else {
                continue;
            };
            if !(0.0..=DOC_W).contains(&u) || !(0.0..=DOC_H).contains(&v) {
                continue;
            }
            let idx = (y * width + x) * 3;
            for (c, value) in doc_color(u, v).iter().enumerate() {
                data[idx + c] = value.round() as u8;
            }
        }
    }
    doc_scan::Frame::from_rgb(width, height, data).unwrap()
}

#[test]
fn test_round_trip_reproduces_document() {
    let quad = Quad::new([
        Point::new(60.0, 40.0),
        Point::new(330.0, 62.0),
        Point::new(350.0, 250.0),
        Point::new(45.0, 230.0),
    ]);
    let frame = photograph(400, 300, &quad);
    let flat = rectify(&frame, &quad).unwrap();
    let (w, h) = (flat.width(), flat.height());
    assert_eq!((w, h), PerspectiveRectifier::destination_size(&quad));

    // Output pixel (i, j) maps to document (i / (w-1), j / (h-1)) in units
    let mut worst = 0.0f64;
    for j in 3..h - 3 {
        for i in 3..w - 3 {
            let u = i as f64 / (w - 1) as f64 * DOC_W;
            let v = j as f64 / (h - 1) as f64 * DOC_H;
            let want = doc_color(u, v);
            for (c, &got) in flat.pixel(i, j).iter().enumerate() {
                worst = worst.max((got as f64 - want[c]).abs());
            }
        }
    }
    assert!(worst <= 4.0, "max channel error {worst}");
}

#[test]
fn test_rectify_is_deterministic() {
    let quad = Quad::new([
        Point::new(20.5, 10.25),
        Point::new(180.0, 30.0),
        Point::new(170.0, 140.0),
        Point::new(10.0, 120.0),
    ]);
    let frame = photograph(200, 160, &quad);
    let a = rectify(&frame, &quad).unwrap();
    let b = rectify(&frame, &quad).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn test_rejects_near_coincident_corners() {
    let frame = doc_scan::Frame::filled(64, 64, doc_scan::PixelFormat::Rgb, 0);
    for epsilon in [0.0f32, 0.25, 0.5, 0.9] {
        let quad = Quad::new([
            Point::new(10.0, 10.0),
            Point::new(10.0 + epsilon, 10.0),
            Point::new(50.0, 50.0),
            Point::new(10.0, 50.0),
        ]);
        let err = rectify(&frame, &quad).unwrap_err();
        assert!(
            matches!(err, ScanError::Geometry(GeometryError::CoincidentCorners { .. })),
            "epsilon {epsilon}: {err}"
        );
    }
}

#[test]
fn test_rejects_non_finite_corners() {
    let frame = doc_scan::Frame::filled(64, 64, doc_scan::PixelFormat::Gray, 0);
    let quad = Quad::new([
        Point::new(f32::NAN, 0.0),
        Point::new(40.0, 0.0),
        Point::new(40.0, 40.0),
        Point::new(0.0, 40.0),
    ]);
    assert!(matches!(
        rectify(&frame, &quad),
        Err(ScanError::Geometry(GeometryError::NonFinite { .. }))
    ));
}
