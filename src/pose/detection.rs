use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

/// 検出モデルの入出力テンソル名
const INPUT_NAME: &str = "image";
const OUTPUT_INDEX: &str = "index";
const OUTPUT_SCORE: &str = "score";
const OUTPUT_BOX: &str = "box";

/// 検出ネットワークの8成分オフセットベクトル
///
/// アンカー位置からの相対値（検出器入力空間、ピクセル単位）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxOffsets {
    /// 対象中心のオフセット
    pub center: [f32; 2],
    /// 対象サイズのオフセット（幅・高さ）
    pub size: [f32; 2],
    /// 2つの安定化キーポイントのオフセット
    pub keypoints: [[f32; 2]; 2],
}

impl BoxOffsets {
    /// モデル出力の8要素から分解する
    pub fn from_raw(raw: &[f32; 8]) -> Self {
        Self {
            center: [raw[0], raw[1]],
            size: [raw[2], raw[3]],
            keypoints: [[raw[4], raw[5]], [raw[6], raw[7]]],
        }
    }
}

/// 1フレーム分の検出結果
///
/// フレーム内で消費される一時データ。クロップ変換の構築後は破棄される。
#[derive(Debug, Clone, Copy)]
pub struct DetectionResult {
    /// 選択されたアンカーの行インデックス（モデル内argmax出力）
    pub anchor_index: usize,
    /// 信頼度スコア
    pub score: f32,
    pub offsets: BoxOffsets,
}

/// 1段目の姿勢検出器
pub struct PoseDetector {
    session: Session,
    score_threshold: f32,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, score_threshold: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load pose detection ONNX model")?;

        Ok(Self {
            session,
            score_threshold,
        })
    }

    /// 前処理済みテンソルから最良の検出を返す
    ///
    /// 入力: [1, 224, 224, 3] の f32 テンソル
    /// 出力: スコアが閾値未満なら None（フレームスキップ）
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Option<DetectionResult>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input_tensor])
            .context("Pose detection inference failed")?;

        let index_out: ndarray::ArrayViewD<i64> = outputs[OUTPUT_INDEX]
            .try_extract_array()
            .context("Failed to extract detection index output")?;
        let score_out: ndarray::ArrayViewD<f32> = outputs[OUTPUT_SCORE]
            .try_extract_array()
            .context("Failed to extract detection score output")?;
        let box_out: ndarray::ArrayViewD<f32> = outputs[OUTPUT_BOX]
            .try_extract_array()
            .context("Failed to extract detection box output")?;

        let anchor_index = *index_out.iter().next().context("Empty index output")? as usize;
        let score = *score_out.iter().next().context("Empty score output")?;

        if score < self.score_threshold {
            debug!(score, "detection below threshold");
            return Ok(None);
        }

        let mut raw = [0.0f32; 8];
        anyhow::ensure!(
            box_out.len() == raw.len(),
            "Unexpected box output length: {}",
            box_out.len()
        );
        for (dst, src) in raw.iter_mut().zip(box_out.iter()) {
            *dst = *src;
        }

        Ok(Some(DetectionResult {
            anchor_index,
            score,
            offsets: BoxOffsets::from_raw(&raw),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_offsets_from_raw() {
        let offsets = BoxOffsets::from_raw(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(offsets.center, [1.0, 2.0]);
        assert_eq!(offsets.size, [3.0, 4.0]);
        assert_eq!(offsets.keypoints[0], [5.0, 6.0]);
        assert_eq!(offsets.keypoints[1], [7.0, 8.0]);
    }
}
