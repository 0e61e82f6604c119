use std::sync::mpsc::Receiver;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{debug, warn};

use crate::config::Config;
use crate::pose::{
    detector_transform, project_landmarks, resolve_crop, sample_affine, to_display, AnchorTable,
    CropWindow, Pose, PoseDetector, PoseLandmarker, DETECTOR_INPUT_SIZE, LANDMARKER_INPUT_SIZE,
    POSE_ANCHOR_COUNT,
};

/// 1フレーム分のパイプライン出力（表示座標系）
///
/// ボックス・円・ランドマークはすべて画像中心原点、画像高さで正規化した
/// 表示座標。フレームごとに生成され、描画層が消費する。
#[derive(Debug, Clone)]
pub struct PoseFrame {
    /// 検出スコア
    pub score: f32,
    /// 対象ボックスの中心とサイズ
    pub box_center: [f32; 2],
    pub box_size: [f32; 2],
    /// 安定化円の中心と半径
    pub circle_center: [f32; 2],
    pub circle_radius: f32,
    /// 33ランドマーク
    pub pose: Pose,
}

/// 2段構成の姿勢推定パイプライン
///
/// 検出器・ランドマーク推定器のセッションとアンカーテーブルを所有する。
/// 所有値なのでどの経路で抜けてもドロップ時にバックエンドが解放される。
pub struct PosePipeline {
    detector: PoseDetector,
    landmarker: PoseLandmarker,
    anchors: AnchorTable,
}

impl PosePipeline {
    /// 設定からモデルとアンカーテーブルを読み込む
    pub fn from_config(config: &Config) -> Result<Self> {
        let anchors = AnchorTable::load(&config.models.anchors, POSE_ANCHOR_COUNT)?;
        let detector =
            PoseDetector::new(&config.models.detector, config.pipeline.score_threshold)?;
        let landmarker = PoseLandmarker::new(&config.models.landmarker)?;

        Ok(Self {
            detector,
            landmarker,
            anchors,
        })
    }

    /// 1フレームを処理する
    ///
    /// 検出 → クロップ解決 → リサンプリング → ランドマーク推定 → 投影。
    /// 2段は逐次実行され、前段の完了後に後段が走る。
    /// 検出スコアが閾値未満なら None（このフレームに対象なし）。
    pub fn process(&mut self, image: &RgbImage) -> Result<Option<PoseFrame>> {
        let (width, height) = image.dimensions();

        let m1 = detector_transform(width, height);
        let detector_input = sample_affine(image, &m1, DETECTOR_INPUT_SIZE);
        let Some(detection) = self.detector.detect(detector_input)? else {
            return Ok(None);
        };
        debug!(
            anchor = detection.anchor_index,
            score = detection.score,
            "stage 1 detection"
        );

        let anchor = self
            .anchors
            .get(detection.anchor_index)
            .context("Detector returned an invalid anchor index")?;
        let crop = resolve_crop(&detection, anchor, width, height);
        debug!(radius = crop.radius, rotation = crop.rotation, "crop window");

        let landmarker_input = sample_affine(image, &crop.transform, LANDMARKER_INPUT_SIZE);
        let raw = self.landmarker.detect(landmarker_input)?;
        let pose = project_landmarks(&raw, &crop, width, height);
        debug!(visible = pose.visible_count(), "stage 2 landmarks");

        Ok(Some(build_frame(detection.score, &crop, pose, width, height)))
    }
}

/// 画像空間のクロップ情報を表示座標のフレーム出力へまとめる
fn build_frame(
    score: f32,
    crop: &CropWindow,
    pose: Pose,
    image_width: u32,
    image_height: u32,
) -> PoseFrame {
    let h = image_height as f32;
    PoseFrame {
        score,
        box_center: to_display(crop.box_center, image_width, image_height),
        box_size: [crop.box_size[0] / h, crop.box_size[1] / h],
        circle_center: to_display(crop.circle_center, image_width, image_height),
        circle_radius: crop.radius / h,
        pose,
    }
}

/// フレームループを駆動するイベント
pub enum FrameEvent {
    /// 新しいフレームが到着した
    Frame(RgbImage),
    /// 停止要求
    Shutdown,
}

/// フレームループの状態。Stoppedが終端で、以後イベントは処理されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
}

/// フレーム到着イベントで駆動される明示的なステートマシン
///
/// 1フレームの2段サイクルが完了するまで次のイベントは取り出さない。
/// チャンネルの切断も停止要求も同じ終端状態に合流する。
pub struct PipelineDriver {
    pipeline: PosePipeline,
    state: DriverState,
}

impl PipelineDriver {
    pub fn new(pipeline: PosePipeline) -> Self {
        Self {
            pipeline,
            state: DriverState::Running,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// 1イベントを処理する。終端状態に達した後は何もしない。
    pub fn handle(&mut self, event: FrameEvent) -> Result<Option<PoseFrame>> {
        if self.state == DriverState::Stopped {
            return Ok(None);
        }
        match event {
            FrameEvent::Frame(image) => self.pipeline.process(&image),
            FrameEvent::Shutdown => {
                self.state = DriverState::Stopped;
                Ok(None)
            }
        }
    }

    /// 受信チャンネルが閉じるか停止要求が来るまでフレームを処理し続ける
    ///
    /// フレーム単位のエラーはそのフレームのスキップとして扱う。
    /// リターン時にパイプラインはドロップされ、バックエンドが解放される。
    pub fn run(mut self, events: Receiver<FrameEvent>, mut on_frame: impl FnMut(PoseFrame)) {
        while self.state == DriverState::Running {
            let event = match events.recv() {
                Ok(event) => event,
                Err(_) => FrameEvent::Shutdown,
            };
            match self.handle(event) {
                Ok(Some(frame)) => on_frame(frame),
                Ok(None) => {}
                Err(e) => warn!("frame skipped: {:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affine::Affine2;

    #[test]
    fn test_build_frame_display_space() {
        let crop = CropWindow {
            transform: Affine2::IDENTITY,
            box_center: [320.0, 240.0],
            box_size: [96.0, 48.0],
            circle_center: [320.0, 480.0],
            radius: 120.0,
            rotation: 0.0,
        };
        let frame = build_frame(0.9, &crop, Pose::default(), 640, 480);

        assert_eq!(frame.score, 0.9);
        // 画像中心のボックスは表示座標原点
        assert_eq!(frame.box_center, [0.0, 0.0]);
        assert!((frame.box_size[0] - 0.2).abs() < 1e-6);
        assert!((frame.box_size[1] - 0.1).abs() < 1e-6);
        // 円: x中央、y上端、半径は高さで正規化
        assert_eq!(frame.circle_center, [0.0, 0.5]);
        assert!((frame.circle_radius - 0.25).abs() < 1e-6);
    }
}
