use doc_scan::{EnhancementMode, Frame, ScanPage, enhance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn receipt(seed: u64) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    let (width, height) = (120, 90);
    let data = (0..width * height)
        .flat_map(|i| {
            let (x, y) = (i % width, i / width);
            // Vignette shadow plus rows of "text"
            let shade = 230 - ((x as i32 - 60).abs() + (y as i32 - 45).abs()) / 3;
            let ink = y % 12 < 3 && (10..110).contains(&x) && rng.gen_bool(0.7);
            let v = if ink { 35 } else { shade.clamp(0, 255) as u8 };
            [v, v.saturating_sub(4), v.saturating_sub(12)]
        })
        .collect();
    Frame::from_rgb(width, height, data).unwrap()
}

#[test]
fn test_switching_modes_never_compounds() {
    let source = receipt(3);
    let direct = enhance(&source, EnhancementMode::Color);

    let mut page = ScanPage::new(source.clone());
    page.set_mode(EnhancementMode::BlackAndWhite);
    page.set_mode(EnhancementMode::Color);
    page.set_mode(EnhancementMode::BlackAndWhite);
    let shown = page.set_mode(EnhancementMode::Color).clone();

    assert_eq!(shown, direct);
    assert_eq!(page.source(), &source);
}

#[test]
fn test_back_to_original_restores_source() {
    let source = receipt(5);
    let mut page = ScanPage::new(source.clone());
    page.set_mode(EnhancementMode::Grayscale);
    assert_ne!(page.current(), &source);
    assert_eq!(page.set_mode(EnhancementMode::Original), &source);
}

#[test]
fn test_black_and_white_removes_shadow() {
    let out = enhance(&receipt(9), EnhancementMode::BlackAndWhite);
    // Shadowed margin away from text is white
    assert_eq!(out.pixel(2, 88), &[255, 255, 255]);
    assert_eq!(out.pixel(117, 1), &[255, 255, 255]);
    let black = out.as_bytes().chunks_exact(3).filter(|p| p[0] == 0).count();
    assert!(black > 0);
}

#[test]
fn test_outputs_keep_dimensions() {
    let source = receipt(1);
    for mode in [
        EnhancementMode::Original,
        EnhancementMode::BlackAndWhite,
        EnhancementMode::Grayscale,
        EnhancementMode::Color,
    ] {
        let out = enhance(&source, mode);
        assert_eq!((out.width(), out.height(), out.format()), (120, 90, source.format()));
    }
}
