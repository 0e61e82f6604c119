use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use blaze_tracker::config::Config;
use blaze_tracker::pipeline::{FrameEvent, PipelineDriver, PosePipeline};

/// ディレクトリ内の連番フレームをストリームとして処理する
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// フレーム画像のディレクトリ（ファイル名順に処理）
    #[arg(long, value_name = "DIR")]
    frames: String,

    /// 設定ファイルのパス
    #[arg(long, default_value = "config.toml", value_name = "FILE")]
    config: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = Config::load_or_default(&args.config);

    println!("Loading models...");
    let pipeline = PosePipeline::from_config(&config)?;
    println!("Models loaded");

    let mut paths: Vec<_> = std::fs::read_dir(&args.frames)
        .with_context(|| format!("Failed to read frame directory {}", args.frames))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("jpg") | Some("jpeg") | Some("png")
            )
        })
        .collect();
    paths.sort();
    anyhow::ensure!(!paths.is_empty(), "No frames found in {}", args.frames);
    println!("Frames: {}", paths.len());

    let (tx, rx) = mpsc::channel();

    // Ctrl-Cは停止イベントとして流す
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(FrameEvent::Shutdown);
    })
    .context("Failed to install Ctrl-C handler")?;

    // 読み込みスレッド: フレームを順に送り、尽きたら停止イベントを送る
    // （Ctrl-Cハンドラが送信側を保持するため、切断には頼れない）
    let reader = thread::spawn(move || {
        for path in paths {
            match image::open(&path) {
                Ok(img) => {
                    if tx.send(FrameEvent::Frame(img.to_rgb8())).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("skipping {}: {}", path.display(), e),
            }
        }
        let _ = tx.send(FrameEvent::Shutdown);
    });

    let mut processed = 0usize;
    PipelineDriver::new(pipeline).run(rx, |frame| {
        processed += 1;
        println!(
            "frame {}: score {:.3}, visible {}/33, circle r {:.3}",
            processed,
            frame.score,
            frame.pose.visible_count(),
            frame.circle_radius
        );
    });

    let _ = reader.join();
    println!("Done: {} poses", processed);

    Ok(())
}
