use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use blaze_tracker::config::Config;
use blaze_tracker::pipeline::{PoseFrame, PosePipeline};
use blaze_tracker::pose::LandmarkIndex;

/// 画像1枚に対して2段姿勢推定パイプラインを実行する
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 入力画像ファイル
    #[arg(long, value_name = "FILE")]
    image: String,

    /// 設定ファイルのパス
    #[arg(long, default_value = "config.toml", value_name = "FILE")]
    config: String,

    /// 検出結果を描画した画像の保存先（省略時は保存しない）
    #[arg(long, value_name = "FILE")]
    overlay: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("blaze-tracker {}", env!("GIT_VERSION"));

    let config = Config::load_or_default(&args.config);

    println!("Loading models...");
    let mut pipeline = PosePipeline::from_config(&config)?;
    println!("Models loaded");

    let image = image::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    println!("Input: {}x{}", width, height);

    let start = Instant::now();
    let frame = pipeline.process(&image)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let Some(frame) = frame else {
        println!("No pose detected ({:.1}ms)", elapsed_ms);
        return Ok(());
    };

    println!("Pose detected ({:.1}ms)", elapsed_ms);
    println!("  score: {:.3}", frame.score);
    println!(
        "  box: center ({:.3}, {:.3}), size ({:.3}, {:.3})",
        frame.box_center[0], frame.box_center[1], frame.box_size[0], frame.box_size[1]
    );
    println!(
        "  circle: center ({:.3}, {:.3}), radius {:.3}",
        frame.circle_center[0], frame.circle_center[1], frame.circle_radius
    );
    println!("  visible landmarks: {}/{}", frame.pose.visible_count(), LandmarkIndex::COUNT);

    for (i, landmark) in frame.pose.landmarks.iter().enumerate() {
        if landmark.visible {
            println!(
                "    [{:2}] ({:+.3}, {:+.3}, {:+.3})",
                i, landmark.x, landmark.y, landmark.z
            );
        }
    }

    if let Some(path) = &args.overlay {
        let mut canvas = image;
        draw_overlay(&mut canvas, &frame);
        canvas
            .save(path)
            .with_context(|| format!("Failed to save overlay {}", path))?;
        println!("Overlay saved: {}", path);
    }

    Ok(())
}

/// 表示座標をラスタのピクセル座標へ戻す
fn display_to_raster(p: [f32; 2], width: u32, height: u32) -> (i32, i32) {
    let h = height as f32;
    let x = p[0] * h + 0.5 * width as f32;
    // 表示座標はy上向き
    let y = (h - 1.0) - (p[1] * h + 0.5 * h);
    (x.round() as i32, y.round() as i32)
}

/// 検出ボックス・安定化円・可視ランドマークを描き込む
fn draw_overlay(canvas: &mut RgbImage, frame: &PoseFrame) {
    let (width, height) = canvas.dimensions();
    let h = height as f32;

    let box_w = (frame.box_size[0] * h) as u32;
    let box_h = (frame.box_size[1] * h) as u32;
    if box_w > 0 && box_h > 0 {
        let (cx, cy) = display_to_raster(frame.box_center, width, height);
        let rect = Rect::at(cx - (box_w / 2) as i32, cy - (box_h / 2) as i32)
            .of_size(box_w, box_h);
        draw_hollow_rect_mut(canvas, rect, Rgb([255, 0, 0]));
    }

    let radius = (frame.circle_radius * h) as i32;
    if radius > 0 {
        let center = display_to_raster(frame.circle_center, width, height);
        draw_hollow_circle_mut(canvas, center, radius, Rgb([0, 128, 255]));
    }

    for landmark in frame.pose.landmarks.iter().filter(|lm| lm.visible) {
        let center = display_to_raster([landmark.x, landmark.y], width, height);
        draw_filled_circle_mut(canvas, center, 3, Rgb([0, 255, 0]));
    }
}
