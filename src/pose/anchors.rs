use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

/// 姿勢検出モデルの出力チャンネル数（= アンカー行数）
pub const POSE_ANCHOR_COUNT: usize = 2254;

/// アンカーテーブルの読み込み・参照エラー
#[derive(Debug, Error)]
pub enum AnchorError {
    /// 2列のカンマ区切りでない行
    #[error("anchor table line {line}: expected 2 comma-separated values")]
    MalformedRow { line: usize },

    /// 数値として解釈できない値
    #[error("anchor table line {line}: invalid number")]
    InvalidNumber {
        line: usize,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// 行数がモデルの出力チャンネル数と一致しない
    #[error("anchor table has {actual} rows, expected {expected}")]
    RowCount { expected: usize, actual: usize },

    /// 範囲外のアンカーインデックス
    #[error("anchor index {index} out of range ({len} anchors)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 検出ネットワークの基準ボックス中心テーブル
///
/// 1行が1出力チャンネルに対応する正規化座標 (x, y)。
/// 起動時に一度読み込んだ後は読み取り専用。
#[derive(Debug, Clone)]
pub struct AnchorTable {
    anchors: Vec<[f32; 2]>,
}

impl AnchorTable {
    /// カンマ区切り2列のテキストを `expected` 行のテーブルとして解析する
    ///
    /// 空行は無視する。行数不一致は致命的エラー（不完全なアンカー集合では
    /// 検出を実行できない）。
    pub fn parse(text: &str, expected: usize) -> Result<Self, AnchorError> {
        let mut anchors = Vec::with_capacity(expected);

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // エラー表示用の行番号は1始まり
            let line_no = index + 1;

            let mut fields = line.split(',');
            let (Some(x), Some(y), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(AnchorError::MalformedRow { line: line_no });
            };

            let x: f32 = x
                .trim()
                .parse()
                .map_err(|source| AnchorError::InvalidNumber { line: line_no, source })?;
            let y: f32 = y
                .trim()
                .parse()
                .map_err(|source| AnchorError::InvalidNumber { line: line_no, source })?;

            anchors.push([x, y]);
        }

        if anchors.len() != expected {
            return Err(AnchorError::RowCount {
                expected,
                actual: anchors.len(),
            });
        }

        Ok(Self { anchors })
    }

    /// ファイルからテーブルを読み込む
    pub fn load<P: AsRef<Path>>(path: P, expected: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read anchor table {}", path.display()))?;
        let table = Self::parse(&text, expected)
            .with_context(|| format!("Failed to parse anchor table {}", path.display()))?;
        Ok(table)
    }

    /// 行インデックスでアンカー (x, y) を取得する
    ///
    /// インデックスは検出ネットワークのargmax出力由来で構成上は常に範囲内。
    /// 範囲外は防御的にエラーとする。
    pub fn get(&self, index: usize) -> Result<[f32; 2], AnchorError> {
        self.anchors
            .get(index)
            .copied()
            .ok_or(AnchorError::IndexOutOfRange {
                index,
                len: self.anchors.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
