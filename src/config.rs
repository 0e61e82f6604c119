use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// 検出モデルのパス
    #[serde(default = "default_detector_model")]
    pub detector: String,
    /// ランドマークモデルのパス
    #[serde(default = "default_landmarker_model")]
    pub landmarker: String,
    /// アンカーテーブルのパス
    #[serde(default = "default_anchors")]
    pub anchors: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// 検出スコアの閾値（未満のフレームはスキップ）
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_detector_model() -> String { "models/pose_detector.onnx".to_string() }
fn default_landmarker_model() -> String { "models/pose_landmarker.onnx".to_string() }
fn default_anchors() -> String { "models/anchors.csv".to_string() }
fn default_score_threshold() -> f32 { 0.5 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detector: default_detector_model(),
            landmarker: default_landmarker_model(),
            anchors: default_anchors(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルト設定で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "config {} not loaded ({}), using defaults",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.models.detector, "models/pose_detector.onnx");
        assert_eq!(config.pipeline.score_threshold, 0.5);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            score_threshold = 0.75
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.score_threshold, 0.75);
        // 未指定のセクションはデフォルト
        assert_eq!(config.models.anchors, "models/anchors.csv");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.pipeline.score_threshold, 0.5);
    }
}
