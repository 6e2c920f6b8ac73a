use doc_scan::tools::{dataset_iter, dataset_root_from_env, load_frame};
use doc_scan::{Frame, PixelFormat};

/// Dark desk with a light page covering the central 80% of the frame
pub fn synthetic_page(width: usize, height: usize) -> Frame {
    let mut frame = Frame::filled(width, height, PixelFormat::Rgb, 45);
    let (x0, y0) = (width / 10, height / 10);
    let (x1, y1) = (width - x0, height - y0);
    let bytes = frame.as_bytes_mut();
    for y in y0..y1 {
        for x in x0..x1 {
            let idx = (y * width + x) * 3;
            bytes[idx..idx + 3].copy_from_slice(&[232, 228, 220]);
        }
    }
    frame
}

/// First image of the dataset (if any), for benches on real photos
#[allow(dead_code)]
pub fn first_dataset_frame() -> Option<Frame> {
    let root = dataset_root_from_env();
    dataset_iter(&root, Some(1))
        .next()
        .and_then(|path| load_frame(path).ok())
}
