use image::RgbImage;
use ndarray::Array4;

use crate::affine::Affine2;

/// アフィン変換で元画像をリサンプリングして入力テンソルに変換する
///
/// `transform` は出力ピクセル座標を元画像空間（y上向き）へ写す行列。
/// 検出器には M1、ランドマーク推定器には M2 をそのまま渡せる。
/// 双線形補間、範囲外は黒（レターボックスのパディング）。
/// 出力: [1, dst_size, dst_size, 3] の f32 テンソル (0.0-1.0)
pub fn sample_affine(image: &RgbImage, transform: &Affine2, dst_size: u32) -> Array4<f32> {
    let size = dst_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    let height = image.height() as f32;

    for y in 0..size {
        for x in 0..size {
            let src = transform.apply([x as f32, y as f32]);
            // 画像空間はy上向き、ラスタは上原点
            let pixel = bilinear(image, src[0], (height - 1.0) - src[1]);
            tensor[[0, y, x, 0]] = pixel[0];
            tensor[[0, y, x, 1]] = pixel[1];
            tensor[[0, y, x, 2]] = pixel[2];
        }
    }

    tensor
}

/// ラスタ座標で双線形サンプリングする（0.0-1.0 正規化）
fn bilinear(image: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    let (w, h) = image.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;

    let mut acc = [0.0f32; 3];
    for (dy, wy) in [(0i64, 1.0 - ty), (1, ty)] {
        for (dx, wx) in [(0i64, 1.0 - tx), (1, tx)] {
            let weight = wx * wy;
            if weight == 0.0 {
                continue;
            }
            let sx = x0 as i64 + dx;
            let sy = y0 as i64 + dy;
            if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                continue;
            }
            let p = image.get_pixel(sx as u32, sy as u32);
            acc[0] += weight * p[0] as f32;
            acc[1] += weight * p[1] as f32;
            acc[2] += weight * p[2] as f32;
        }
    }

    [acc[0] / 255.0, acc[1] / 255.0, acc[2] / 255.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 2x2画像: 左上R、右上G、左下B、右下白
    fn test_image() -> RgbImage {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(0, 1, Rgb([0, 0, 255]));
        img.put_pixel(1, 1, Rgb([255, 255, 255]));
        img
    }

    fn channel(tensor: &Array4<f32>, y: usize, x: usize) -> [f32; 3] {
        [tensor[[0, y, x, 0]], tensor[[0, y, x, 1]], tensor[[0, y, x, 2]]]
    }

    #[test]
    fn test_identity_flips_vertically() {
        // 恒等変換: 出力のy=0は画像空間の下端（ラスタの最下行）
        let tensor = sample_affine(&test_image(), &Affine2::IDENTITY, 2);
        assert_eq!(channel(&tensor, 0, 0), [0.0, 0.0, 1.0]); // 左下B
        assert_eq!(channel(&tensor, 0, 1), [1.0, 1.0, 1.0]); // 右下白
        assert_eq!(channel(&tensor, 1, 0), [1.0, 0.0, 0.0]); // 左上R
        assert_eq!(channel(&tensor, 1, 1), [0.0, 1.0, 0.0]); // 右上G
    }

    #[test]
    fn test_out_of_bounds_is_black() {
        let transform = Affine2::translation([10.0, 10.0]);
        let tensor = sample_affine(&test_image(), &transform, 2);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(channel(&tensor, y, x), [0.0, 0.0, 0.0]);
            }
        }
    }

    #[test]
    fn test_bilinear_blends_neighbors() {
        // ラスタ(0.5, 0)はRとGの中間
        let pixel = bilinear(&test_image(), 0.5, 0.0);
        assert!((pixel[0] - 0.5).abs() < 1e-6);
        assert!((pixel[1] - 0.5).abs() < 1e-6);
        assert!((pixel[2]).abs() < 1e-6);
    }

    #[test]
    fn test_tensor_shape() {
        let tensor = sample_affine(&test_image(), &Affine2::IDENTITY, 4);
        assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
    }
}
