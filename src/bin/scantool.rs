use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use doc_scan::detector::edges::canny;
use doc_scan::tools::{
    dataset_iter, dataset_root_from_env, edge_stats, grayscale_stats, label_path, load_frame,
    parse_corner_labels, save_frame,
};
use doc_scan::utils::clahe::clahe;
use doc_scan::utils::filter::gaussian_blur;
use doc_scan::utils::grayscale::frame_to_grayscale;
use doc_scan::{
    DetectionResult, DetectionStrategy, EnhancementMode, LiveSession, Point, Quad, ScanConfig,
    Scanner,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "scantool", version, about = "Document scanner CLI tools")]
struct Cli {
    /// TOML config file (defaults to $DOC_SCAN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the document outline in one image
    Detect {
        #[arg(long)]
        image: PathBuf,
        /// Also print grayscale and edge statistics
        #[arg(long)]
        verbose: bool,
    },
    /// Warp the region inside four corners to a flat image
    Rectify {
        #[arg(long)]
        image: PathBuf,
        /// Corners as `x,y` pairs, any order
        #[arg(long, num_args = 4, value_parser = parse_point)]
        corners: Vec<Point>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Apply an enhancement filter
    Enhance {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, value_enum)]
        mode: Mode,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run the neural detector (needs a model and the `backend-tract` feature)
    Neural {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, env = "DOC_SCAN_MODEL")]
        model: PathBuf,
    },
    /// Detect, rectify and enhance in one go
    Scan {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Original)]
        mode: Mode,
        #[arg(long)]
        out: PathBuf,
    },
    /// Compare detections against `<image>.txt` corner labels in a dataset
    Eval {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        /// Max corner error, in pixels, counted as a hit
        #[arg(long, default_value_t = 10.0)]
        tolerance: f32,
    },
    /// Replay a directory of frames through the live stabilizer
    Live {
        #[arg(long)]
        frames: PathBuf,
        /// Time each frame stays current
        #[arg(long, default_value_t = 200)]
        frame_ms: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Original,
    BlackAndWhite,
    Grayscale,
    Color,
}

impl From<Mode> for EnhancementMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Original => EnhancementMode::Original,
            Mode::BlackAndWhite => EnhancementMode::BlackAndWhite,
            Mode::Grayscale => EnhancementMode::Grayscale,
            Mode::Color => EnhancementMode::Color,
        }
    }
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {raw:?}"))?;
    let x = x.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f32>().map_err(|e| e.to_string())?;
    Ok(Point::new(x, y))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ScanConfig::from_path(path)?,
        None => ScanConfig::load()?,
    };

    match cli.command {
        Command::Detect { image, verbose } => detect_cmd(&config, &image, verbose),
        Command::Rectify {
            image,
            corners,
            out,
        } => rectify_cmd(&image, &corners, &out),
        Command::Enhance { image, mode, out } => enhance_cmd(&image, mode.into(), &out),
        Command::Neural { image, model } => neural_cmd(&config, &image, &model),
        Command::Scan { image, mode, out } => scan_cmd(&config, &image, mode.into(), &out),
        Command::Eval {
            root,
            limit,
            tolerance,
        } => eval_cmd(&config, root, limit, tolerance),
        Command::Live { frames, frame_ms } => live_cmd(&config, &frames, frame_ms),
    }
}

fn print_result(result: &DetectionResult) {
    println!(
        "detected={} method={:?} confidence={:.3}",
        result.detected, result.method, result.confidence
    );
    if let Some(quad) = &result.quad {
        for (name, p) in ["TL", "TR", "BR", "BL"].iter().zip(quad.corners()) {
            println!("  {name}: ({:.1}, {:.1})", p.x, p.y);
        }
    }
    for (i, b) in result.candidates.iter().enumerate() {
        println!(
            "  candidate {i}: [{:.0}, {:.0}, {:.0}, {:.0}] class={} conf={:.3}",
            b.x1, b.y1, b.x2, b.y2, b.class_id, b.confidence
        );
    }
}

fn detect_cmd(config: &ScanConfig, image: &Path, verbose: bool) -> Result<()> {
    let frame = load_frame(image)?;
    println!("Image: {} ({}x{})", image.display(), frame.width(), frame.height());

    if verbose {
        let (w, h) = (frame.width(), frame.height());
        let options = &config.contour;
        let gray = frame_to_grayscale(&frame);
        let stats = grayscale_stats(&gray);
        println!("Gray: min={} max={} avg={}", stats.min, stats.max, stats.avg);
        let blurred = gaussian_blur(&clahe(&gray, w, h, options.clahe), w, h, options.blur_kernel);
        let edges = edge_stats(&canny(&blurred, w, h, options.canny_low, options.canny_high));
        println!(
            "Edges: {} of {} ({:.2}%)",
            edges.edge_pixels,
            edges.total_pixels,
            edges.edge_ratio * 100.0
        );
    }

    let start = Instant::now();
    let result = doc_scan::detect_contour(&frame, &config.contour);
    println!("Time: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
    print_result(&result);
    Ok(())
}

fn rectify_cmd(image: &Path, corners: &[Point], out: &Path) -> Result<()> {
    let frame = load_frame(image)?;
    let quad = doc_scan::order_corners(corners, doc_scan::CornerStrategy::AxisSort)
        .context("exactly four corners are required")?;
    let flat = doc_scan::rectify(&frame, &quad)?;
    save_frame(out, &flat)?;
    println!("Wrote {} ({}x{})", out.display(), flat.width(), flat.height());
    Ok(())
}

fn enhance_cmd(image: &Path, mode: EnhancementMode, out: &Path) -> Result<()> {
    let frame = load_frame(image)?;
    save_frame(out, &doc_scan::enhance(&frame, mode))?;
    println!("Wrote {} ({:?})", out.display(), mode);
    Ok(())
}

fn neural_cmd(config: &ScanConfig, image: &Path, model: &Path) -> Result<()> {
    let frame = load_frame(image)?;
    let mut detector = match doc_scan::load_model(model, &config.neural.options) {
        doc_scan::ModelStatus::Ready(detector) => detector,
        doc_scan::ModelStatus::Failed(reason) => bail!("model unavailable: {reason}"),
    };
    let start = Instant::now();
    let result = detector.detect(&frame)?;
    println!(
        "Backend: {} Time: {:.2}ms",
        detector.backend_name(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    print_result(&result);
    Ok(())
}

fn scan_cmd(config: &ScanConfig, image: &Path, mode: EnhancementMode, out: &Path) -> Result<()> {
    let frame = load_frame(image)?;
    let mut scanner = Scanner::from_config(config);
    let scanned = scanner.scan(&frame, mode)?;
    print_result(&scanned.detection);
    if !scanned.detection.detected {
        println!("No document found, used inset fallback");
    }
    let page = scanned.page.current();
    save_frame(out, page)?;
    println!("Wrote {} ({}x{})", out.display(), page.width(), page.height());
    Ok(())
}

fn eval_cmd(
    config: &ScanConfig,
    root: Option<PathBuf>,
    limit: Option<usize>,
    tolerance: f32,
) -> Result<()> {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let mut scanner = Scanner::from_config(config);
    let mut labelled = 0usize;
    let mut hits = 0usize;
    let mut total_time = Duration::ZERO;

    for path in dataset_iter(&root, limit) {
        let Some(labels) = parse_corner_labels(label_path(&path)) else {
            continue;
        };
        let frame = match load_frame(&path) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("skipping {}: {err}", path.display());
                continue;
            }
        };
        labelled += 1;
        let start = Instant::now();
        let result = scanner.detect(&frame);
        total_time += start.elapsed();

        let error = result.quad.map(|q: Quad| {
            labels
                .iter()
                .map(|l| q.max_corner_distance(l))
                .fold(f32::MAX, f32::min)
        });
        let hit = result.detected && error.is_some_and(|e| e <= tolerance);
        if hit {
            hits += 1;
        }
        println!(
            "{} {} err={}",
            if hit { "HIT " } else { "MISS" },
            path.display(),
            error.map_or("-".to_string(), |e| format!("{e:.1}px"))
        );
    }

    if labelled == 0 {
        bail!("no labelled images under {}", root.display());
    }
    println!(
        "Detection rate: {}/{} ({:.1}%), avg {:.2}ms",
        hits,
        labelled,
        hits as f64 * 100.0 / labelled as f64,
        total_time.as_secs_f64() * 1000.0 / labelled as f64
    );
    Ok(())
}

fn live_cmd(config: &ScanConfig, frames_dir: &Path, frame_ms: u64) -> Result<()> {
    let frames: Vec<PathBuf> = dataset_iter(frames_dir, None).collect();
    if frames.is_empty() {
        bail!("no frames under {}", frames_dir.display());
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async {
        let scanner = Scanner::from_config(config);
        let strategy: DetectionStrategy = scanner.active_strategy();
        let session = LiveSession::start(scanner, config.live.clone());
        println!("Live: {} frames, strategy {:?}", frames.len(), strategy);

        for path in &frames {
            session.push_frame(load_frame(path)?);
            tokio::time::sleep(Duration::from_millis(frame_ms)).await;
            let snapshot = session.snapshot();
            let stable = snapshot
                .stable
                .as_ref()
                .and_then(|r| r.quad)
                .map_or("not stable".to_string(), |q| format!("{:?}", q.corners()));
            println!(
                "{}: {} attempts, ratio {:.2}, {}",
                path.display(),
                snapshot.attempts,
                snapshot.success_ratio,
                stable
            );
        }
        session.stop().await;
        Ok::<(), anyhow::Error>(())
    })
}
