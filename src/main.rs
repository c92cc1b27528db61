//! Aim OCR CLI
//!
//! Command-line demonstration of the frame-to-OCR pipeline using a mock
//! frame source and a scripted mock engine.

use aim_ocr::{
    capture::{CaptureConfig, FileConfig, FrameSource, MockFrameSource, PipelineConfig},
    ocr::MockOcrEngine,
    pipeline::OcrPipeline,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "aim-ocr", version, about = "Live camera OCR pipeline demo")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to feed through the pipeline.
    #[arg(long, default_value_t = 100)]
    frames: u32,

    /// Override the sampling interval.
    #[arg(long)]
    interval: Option<u32>,

    /// Restrict recognition to these characters.
    #[arg(long)]
    allow_list: Option<String>,

    /// Surface normalized images and write them as PNG snapshots.
    #[arg(long)]
    debug: bool,

    /// Directory for debug snapshots.
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Aim OCR v{}", aim_ocr::VERSION);
    info!("This is a demonstration using a mock frame source and engine");

    let (mut pipeline_config, capture_config) = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(file) => (file.pipeline, file.capture),
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => (PipelineConfig::default(), CaptureConfig::default()),
    };

    if let Some(interval) = args.interval {
        pipeline_config.sample_interval = interval;
    }
    if let Some(allow_list) = &args.allow_list {
        pipeline_config.allow_list = Some(allow_list.clone());
    }
    pipeline_config.debug_mode |= args.debug;

    // Scripted responses stand in for a real engine: raw readings with
    // stray whitespace and the occasional unreadable frame.
    let base = [
        Some("4821".to_string()),
        Some(" 73 94 ".to_string()),
        None,
        Some("1006".to_string()),
    ];
    let samples = (args.frames / pipeline_config.sample_interval.max(1) + 1) as usize;
    let script: Vec<_> = base.iter().cloned().cycle().take(samples).collect();
    let engine = MockOcrEngine::with_script(script);

    let mut pipeline = match OcrPipeline::new(pipeline_config, engine) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Failed to set up pipeline: {}", e);
            std::process::exit(1);
        }
    };

    // Blocking notification path.
    pipeline.add_handler(Box::new(|text: &str| {
        info!(text = %text, "blocking handler notified");
    }));

    // Non-blocking notification path.
    let mut text_rx = pipeline.subscribe_text();
    let printer = tokio::spawn(async move {
        while let Ok(text) = text_rx.recv().await {
            println!("recognized: {}", text);
        }
    });

    let snapshot_writer = if args.debug {
        if let Err(e) = std::fs::create_dir_all(&args.snapshot_dir) {
            eprintln!(
                "Failed to create snapshot dir {}: {}",
                args.snapshot_dir.display(),
                e
            );
            std::process::exit(1);
        }
        let mut debug_rx = pipeline.debug_frames();
        let dir = args.snapshot_dir.clone();
        Some(tokio::spawn(async move {
            let mut index = 0u32;
            while debug_rx.changed().await.is_ok() {
                let snapshot = debug_rx.borrow_and_update().clone();
                let Some(snapshot) = snapshot else { continue };

                println!("debug: {}", snapshot.text.as_deref().unwrap_or("-"));

                let (width, height) = (snapshot.image.width(), snapshot.image.height());
                let Some(png) = image::RgbaImage::from_raw(width, height, snapshot.image.to_rgba())
                else {
                    warn!("debug snapshot had inconsistent dimensions");
                    continue;
                };
                let path = dir.join(format!("frame-{:04}.png", index));
                match png.save(&path) {
                    Ok(()) => info!(path = %path.display(), "snapshot written"),
                    Err(e) => warn!(error = %e, "failed to write snapshot"),
                }
                index += 1;
            }
        }))
    } else {
        None
    };

    let mut source = MockFrameSource::new();
    if let Err(e) = source.open(&capture_config) {
        eprintln!("Failed to open frame source: {}", e);
        std::process::exit(1);
    }

    info!(frames = args.frames, "feeding frames...");
    for _ in 0..args.frames {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "frame capture failed");
                continue;
            }
        };
        pipeline.handle_frame(frame);

        // Pace delivery like a sensor would.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Let a final in-flight recognition drain, then tear down.
    tokio::time::sleep(Duration::from_millis(50)).await;
    pipeline.stop().await;
    source.close();

    let stats = pipeline.stats();
    info!(
        seen = stats.frames_seen,
        sampled = stats.frames_sampled,
        dropped_busy = stats.dropped_busy,
        skipped = stats.skipped_geometry,
        "done"
    );

    printer.abort();
    if let Some(writer) = snapshot_writer {
        writer.abort();
    }
}
