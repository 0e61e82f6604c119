use std::time::Instant;

use anyhow::{Context, Result};
use blaze_tracker::config::Config;
use blaze_tracker::pose::{
    detector_transform, project_landmarks, resolve_crop, sample_affine, AnchorTable, PoseDetector,
    PoseLandmarker, DETECTOR_INPUT_SIZE, LANDMARKER_INPUT_SIZE, POSE_ANCHOR_COUNT,
};

/// 各ステージの所要時間を計測する
fn main() -> Result<()> {
    let image_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample.jpg".to_string());
    let config = Config::load_or_default("config.toml");

    let image = image::open(&image_path)
        .with_context(|| format!("Failed to open image {}", image_path))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    println!("Input: {}x{} ({})", width, height, image_path);

    let anchors = AnchorTable::load(&config.models.anchors, POSE_ANCHOR_COUNT)?;
    let mut detector = PoseDetector::new(&config.models.detector, config.pipeline.score_threshold)?;
    let mut landmarker = PoseLandmarker::new(&config.models.landmarker)?;

    // ウォームアップ1回（セッション初回実行のコストを除外）
    let m1 = detector_transform(width, height);
    let warmup = sample_affine(&image, &m1, DETECTOR_INPUT_SIZE);
    let Some(detection) = detector.detect(warmup)? else {
        anyhow::bail!("No pose detected in {}", image_path);
    };
    let anchor = anchors.get(detection.anchor_index)?;
    let crop = resolve_crop(&detection, anchor, width, height);
    let _ = landmarker.detect(sample_affine(&image, &crop.transform, LANDMARKER_INPUT_SIZE))?;

    let iterations = 50;
    let mut preprocess_ms = 0.0f64;
    let mut detect_ms = 0.0f64;
    let mut crop_ms = 0.0f64;
    let mut landmark_ms = 0.0f64;
    let mut project_ms = 0.0f64;

    for _ in 0..iterations {
        let t = Instant::now();
        let input = sample_affine(&image, &m1, DETECTOR_INPUT_SIZE);
        preprocess_ms += t.elapsed().as_secs_f64() * 1000.0;

        let t = Instant::now();
        let detection = detector
            .detect(input)?
            .context("Detection lost during benchmark")?;
        detect_ms += t.elapsed().as_secs_f64() * 1000.0;

        let t = Instant::now();
        let anchor = anchors.get(detection.anchor_index)?;
        let crop = resolve_crop(&detection, anchor, width, height);
        let landmarker_input = sample_affine(&image, &crop.transform, LANDMARKER_INPUT_SIZE);
        crop_ms += t.elapsed().as_secs_f64() * 1000.0;

        let t = Instant::now();
        let raw = landmarker.detect(landmarker_input)?;
        landmark_ms += t.elapsed().as_secs_f64() * 1000.0;

        let t = Instant::now();
        let _ = project_landmarks(&raw, &crop, width, height);
        project_ms += t.elapsed().as_secs_f64() * 1000.0;
    }

    let n = iterations as f64;
    let total = (preprocess_ms + detect_ms + crop_ms + landmark_ms + project_ms) / n;
    println!("Averages over {} iterations:", iterations);
    println!("  detector preprocess: {:.2}ms", preprocess_ms / n);
    println!("  detector inference:  {:.2}ms", detect_ms / n);
    println!("  crop + resample:     {:.2}ms", crop_ms / n);
    println!("  landmark inference:  {:.2}ms", landmark_ms / n);
    println!("  projection:          {:.2}ms", project_ms / n);
    println!("Pipeline: {:.2}ms/frame = {:.1} FPS", total, 1000.0 / total);

    Ok(())
}
