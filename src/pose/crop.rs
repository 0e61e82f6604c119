use std::f32::consts::FRAC_PI_2;

use tracing::warn;

use crate::affine::Affine2;

use super::detection::DetectionResult;

/// 検出器の入力一辺サイズ
pub const DETECTOR_INPUT_SIZE: u32 = 224;
/// ランドマーク推定器の入力一辺サイズ
pub const LANDMARKER_INPUT_SIZE: u32 = 256;

/// 安定化キーポイント間距離からクロップ半径への拡張係数
const CROP_DILATION: f32 = 1.25;

/// 2段目のクロップ窓
///
/// `transform` はランドマーク推定器の入力ピクセルを元画像空間へ写す
/// アフィン行列。box/circle は可視化用の画像空間の値。
#[derive(Debug, Clone, Copy)]
pub struct CropWindow {
    pub transform: Affine2,
    /// 対象ボックス中心（画像空間）
    pub box_center: [f32; 2],
    /// 対象ボックスサイズ（画像空間）
    pub box_size: [f32; 2],
    /// クロップ円の中心 = 第1安定化キーポイント（画像空間）
    pub circle_center: [f32; 2],
    /// クロップ円の半径（画像空間）
    pub radius: f32,
    /// クロップの回転角（ラジアン）
    pub rotation: f32,
}

/// 検出器空間から元画像空間への逆写像 M1 を構築する
///
/// 非正方形画像は長辺基準のレターボックスで検出器の正方形入力に収まるため、
/// 平行移動でアスペクト差を補正し、縦軸はテクスチャ座標系に合わせて反転する。
pub fn detector_transform(image_width: u32, image_height: u32) -> Affine2 {
    let w = image_width as f32;
    let h = image_height as f32;
    let size = w.max(h);
    let scale = size / DETECTOR_INPUT_SIZE as f32;

    Affine2::translation([0.5 * (w - size), 0.5 * (h + size)]) * Affine2::scale([scale, -scale])
}

/// 検出結果から2段目のクロップ窓を解決する
///
/// アンカー位置にオフセットを加えて検出器空間の各点を復元し、M1 で画像空間へ
/// 投影する。2つの安定化キーポイント間のベクトルからクロップの半径と回転を
/// 求め、クロップ窓の変換 M2 を合成する。決定的かつ純粋な計算。
pub fn resolve_crop(
    detection: &DetectionResult,
    anchor: [f32; 2],
    image_width: u32,
    image_height: u32,
) -> CropWindow {
    let m1 = detector_transform(image_width, image_height);
    let d = DETECTOR_INPUT_SIZE as f32;
    let anchor_pos = [d * anchor[0], d * anchor[1]];
    let offsets = &detection.offsets;

    // 検出器空間の各点を画像空間へ
    let center = m1.apply([
        anchor_pos[0] + offsets.center[0],
        anchor_pos[1] + offsets.center[1],
    ]);
    let top_right = m1.apply([
        anchor_pos[0] + offsets.center[0] + 0.5 * offsets.size[0],
        anchor_pos[1] + offsets.center[1] + 0.5 * offsets.size[1],
    ]);
    let kp0 = m1.apply([
        anchor_pos[0] + offsets.keypoints[0][0],
        anchor_pos[1] + offsets.keypoints[0][1],
    ]);
    let kp1 = m1.apply([
        anchor_pos[0] + offsets.keypoints[1][0],
        anchor_pos[1] + offsets.keypoints[1][1],
    ]);

    // キーポイント軸は正準姿勢で垂直に走る想定
    let delta = [kp0[0] - kp1[0], kp0[1] - kp1[1]];
    let length = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt();
    if length == 0.0 {
        // atan2(0,0) = 0 を既定の角度として受け入れるが、黙殺はしない
        warn!(
            anchor_index = detection.anchor_index,
            "degenerate stabilization keypoints: zero-length delta, rotation defaults"
        );
    }
    let radius = CROP_DILATION * length;
    let theta = delta[1].atan2(delta[0]);
    let rotation = FRAC_PI_2 - theta;

    // M2: kp0 へ移動 → 半径スケール（縦反転）→ 回転 → 入力半サイズ分戻す
    let half = 0.5 * LANDMARKER_INPUT_SIZE as f32;
    let s = radius / half;
    let transform = Affine2::translation(kp0)
        * Affine2::scale([s, -s])
        * Affine2::rotation(rotation)
        * Affine2::translation([-half, -half]);

    CropWindow {
        transform,
        box_center: center,
        box_size: [
            2.0 * (top_right[0] - center[0]).abs(),
            2.0 * (top_right[1] - center[1]).abs(),
        ],
        circle_center: kp0,
        radius,
        rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::detection::BoxOffsets;

    fn detection(offsets: [f32; 8]) -> DetectionResult {
        DetectionResult {
            anchor_index: 0,
            score: 0.9,
            offsets: BoxOffsets::from_raw(&offsets),
        }
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_detector_transform_scale_640x480() {
        let m1 = detector_transform(640, 480);
        // 単位ベクトルの写像からスケールを確認: max(640,480)/224
        let origin = m1.apply([0.0, 0.0]);
        let unit_x = m1.apply([1.0, 0.0]);
        let unit_y = m1.apply([0.0, 1.0]);
        let scale = 640.0 / 224.0;
        assert!(approx_eq(unit_x[0] - origin[0], scale, 1e-4));
        // 縦軸は反転
        assert!(approx_eq(unit_y[1] - origin[1], -scale, 1e-4));
    }

    #[test]
    fn test_detector_transform_aspect_offset() {
        // 非正方形: 正方形の検出器入力に対して縦方向がレターボックスされる
        let m1 = detector_transform(640, 480);
        assert_eq!(m1.apply([0.0, 0.0]), [0.0, 560.0]);
        // 検出器入力の中心は画像の中心に写る
        let center = m1.apply([112.0, 112.0]);
        assert!(approx_eq(center[0], 320.0, 1e-3));
        assert!(approx_eq(center[1], 240.0, 1e-3));
    }

    #[test]
    fn test_detector_transform_square_image() {
        let m1 = detector_transform(224, 224);
        assert_eq!(m1.apply([0.0, 0.0]), [0.0, 224.0]);
        let center = m1.apply([112.0, 112.0]);
        assert!(approx_eq(center[0], 112.0, 1e-3));
        assert!(approx_eq(center[1], 112.0, 1e-3));
    }

    #[test]
    fn test_resolve_crop_vertical_keypoint_axis() {
        // 224x224（scale=1）、アンカー(0.1, 0.2)、安定化キーポイントのみ非ゼロ
        let det = detection([0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
        let crop = resolve_crop(&det, [0.1, 0.2], 224, 224);

        // キーポイント間距離10 → 半径 1.25 * 10
        assert!(approx_eq(crop.radius, 12.5, 1e-4), "radius={}", crop.radius);
        // 垂直軸 → theta = atan2(10, 0) = π/2 → 回転 0
        assert!(approx_eq(crop.rotation, 0.0, 1e-5), "rotation={}", crop.rotation);

        // 円の中心は第1キーポイントの画像空間位置
        // anchor_pos = (22.4, 44.8), kp0 = (32.4, 44.8) → (32.4, 224 - 44.8)
        assert!(approx_eq(crop.circle_center[0], 32.4, 1e-3));
        assert!(approx_eq(crop.circle_center[1], 179.2, 1e-3));
    }

    #[test]
    fn test_resolve_crop_transform_centers_on_keypoint() {
        let det = detection([0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
        let crop = resolve_crop(&det, [0.1, 0.2], 224, 224);

        // クロップ窓の中心ピクセルは第1安定化キーポイントに写る
        let half = 0.5 * LANDMARKER_INPUT_SIZE as f32;
        let mapped = crop.transform.apply([half, half]);
        assert!(approx_eq(mapped[0], crop.circle_center[0], 1e-3));
        assert!(approx_eq(mapped[1], crop.circle_center[1], 1e-3));
    }

    #[test]
    fn test_resolve_crop_box_size() {
        // scale=1でsizeオフセット(20, 10) → 画像空間のボックスサイズ(20, 10)
        let det = detection([0.0, 0.0, 20.0, 10.0, 10.0, 0.0, 10.0, 10.0]);
        let crop = resolve_crop(&det, [0.5, 0.5], 224, 224);
        assert!(approx_eq(crop.box_size[0], 20.0, 1e-3), "w={}", crop.box_size[0]);
        assert!(approx_eq(crop.box_size[1], 10.0, 1e-3), "h={}", crop.box_size[1]);
    }

    #[test]
    fn test_resolve_crop_degenerate_keypoints() {
        // 安定化キーポイントが一致 → 長さ0、角度は atan2(0,0) = 0 に落ちる
        let det = detection([0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0]);
        let crop = resolve_crop(&det, [0.5, 0.5], 224, 224);
        assert_eq!(crop.radius, 0.0);
        assert!(approx_eq(crop.rotation, FRAC_PI_2, 1e-6));
    }

    #[test]
    fn test_resolve_crop_radius_scales_with_image() {
        // 448x448 → scale=2: 検出器空間の距離10が画像空間では20
        let det = detection([0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
        let crop = resolve_crop(&det, [0.1, 0.2], 448, 448);
        assert!(approx_eq(crop.radius, 25.0, 1e-3), "radius={}", crop.radius);
    }
}
