// src/main.rs

use anyhow::{Context, Result};
use pose_analysis::frame_decode::decode_image_bytes;
use pose_analysis::video_processor::VideoProcessor;
use pose_analysis::{into_response, AnalysisContext, AnalysisResult, CancelToken, Config};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

fn main() -> Result<()> {
    let config_path = std::env::var("POSE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pose_analysis={},ort=warn", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🧘 Pose analysis starting");
    info!("✓ Configuration loaded from {}", config_path);

    let context = AnalysisContext::from_config(&config);
    let video_processor = VideoProcessor::new(config.video.clone());

    let targets: Vec<PathBuf> = match std::env::args().nth(1) {
        Some(arg) => vec![PathBuf::from(arg)],
        None => video_processor.find_video_files()?,
    };

    if targets.is_empty() {
        warn!("No video files found in {}", config.video.input_dir);
        return Ok(());
    }

    for (idx, path) in targets.iter().enumerate() {
        info!("Processing {}/{}: {}", idx + 1, targets.len(), path.display());

        match analyze_path(&context, path) {
            Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            Err(e) => error!("Failed to analyze {}: {:#}", path.display(), e),
        }
    }

    let summary = context.metrics().summary();
    info!(
        "Done: {} videos, {} live frames, {} frames scanned ({} skipped), {} failures, {:.1} FPS",
        summary.videos_analyzed,
        summary.live_calls,
        summary.frames_scanned,
        summary.frames_skipped,
        summary.failures,
        summary.fps
    );

    Ok(())
}

/// Images go through the live path, everything else is treated as video
fn analyze_path(context: &AnalysisContext, path: &Path) -> Result<AnalysisResult> {
    let mut detector = context.open_detector_session()?;

    let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false);

    let outcome = if is_image {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let frame = decode_image_bytes(&bytes)?;
        context.analyze_live_frame(&mut detector, &frame)
    } else {
        context.analyze_video(&mut detector, path, &CancelToken::new())
    };

    Ok(into_response(outcome))
}
