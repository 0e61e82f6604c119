use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::crop::CropWindow;
use super::keypoint::{to_display, Landmark, LandmarkIndex, Pose};

/// ランドマークモデルの入出力テンソル名
const INPUT_NAME: &str = "image";
const OUTPUT_LANDMARKS: &str = "landmarks";

/// ランドマーク1点あたりの出力値数 (x, y, depth, visibility, presence)
pub const LANDMARK_VALUES: usize = 5;

/// visibility / presence の可視判定閾値（両方がこれを超える必要がある）
const VISIBILITY_THRESHOLD: f32 = 0.5;

/// 2段目のランドマーク推定器
pub struct PoseLandmarker {
    session: Session,
}

impl PoseLandmarker {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load pose landmark ONNX model")?;

        Ok(Self { session })
    }

    /// 前処理済みテンソルから生のランドマーク出力を返す
    ///
    /// 入力: [1, 256, 256, 3] の f32 テンソル
    /// 出力: 33 * 5 値のフラットなベクタ
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input_tensor])
            .context("Pose landmark inference failed")?;

        let raw: ndarray::ArrayViewD<f32> = outputs[OUTPUT_LANDMARKS]
            .try_extract_array()
            .context("Failed to extract landmark output")?;

        let expected = LandmarkIndex::COUNT * LANDMARK_VALUES;
        anyhow::ensure!(
            raw.len() == expected,
            "Unexpected landmark output length: {} (expected {})",
            raw.len(),
            expected
        );

        Ok(raw.iter().copied().collect())
    }
}

/// 生のランドマーク出力を表示座標の姿勢へ投影する
///
/// 各ランドマークの (x, y) はクロップ窓の入力ピクセル座標。M2 で画像空間へ
/// 写した後、表示座標へ正規化する。奥行きは画像高さで正規化。
/// 要素ごとの純粋な写像でエラー条件はない。
pub fn project_landmarks(
    raw: &[f32],
    crop: &CropWindow,
    image_width: u32,
    image_height: u32,
) -> Pose {
    debug_assert_eq!(raw.len(), LandmarkIndex::COUNT * LANDMARK_VALUES);

    let h = image_height as f32;
    let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];

    for (i, landmark) in landmarks.iter_mut().enumerate() {
        let values = &raw[i * LANDMARK_VALUES..(i + 1) * LANDMARK_VALUES];
        let position = crop.transform.apply([values[0], values[1]]);
        let display = to_display(position, image_width, image_height);

        let visibility = values[3];
        let presence = values[4];

        *landmark = Landmark::new(
            display[0],
            display[1],
            values[2] / h,
            visibility > VISIBILITY_THRESHOLD && presence > VISIBILITY_THRESHOLD,
        );
    }

    Pose::new(landmarks)
}
