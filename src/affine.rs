/// 2Dアフィン変換（同次座標の3x3行列、f32）
///
/// 平行移動・スケール・回転を行列積で合成する。
/// 合成は結合的だが可換ではないため、変換の適用順は積の順序で決まる:
/// `(a * b).apply(p) == a.apply(b.apply(p))`（右側が先に適用される）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    /// 行優先の 3x3 行列。最下行は常に [0, 0, 1]。
    pub m: [[f32; 3]; 3],
}

impl Affine2 {
    /// 単位行列
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// 平行移動行列
    pub fn translation(t: [f32; 2]) -> Self {
        Self {
            m: [[1.0, 0.0, t[0]], [0.0, 1.0, t[1]], [0.0, 0.0, 1.0]],
        }
    }

    /// スケール行列。負の成分は軸の反転を表す。
    pub fn scale(s: [f32; 2]) -> Self {
        Self {
            m: [[s[0], 0.0, 0.0], [0.0, s[1], 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// 回転行列（ラジアン、反時計回り）
    pub fn rotation(theta: f32) -> Self {
        let (sin_t, cos_t) = theta.sin_cos();
        Self {
            m: [
                [cos_t, -sin_t, 0.0],
                [sin_t, cos_t, 0.0],
                [0.0, 0.0, 1.0],
            ],
        }
    }

    /// 点に変換を適用する。同次座標の第3成分は常に1。
    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        [
            self.m[0][0] * p[0] + self.m[0][1] * p[1] + self.m[0][2],
            self.m[1][0] * p[0] + self.m[1][1] * p[1] + self.m[1][2],
        ]
    }
}

impl std::ops::Mul for Affine2 {
    type Output = Affine2;

    /// 行列積による合成。順序は保存される。
    fn mul(self, rhs: Affine2) -> Affine2 {
        let mut m = [[0.0f32; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.m[i][0] * rhs.m[0][j]
                    + self.m[i][1] * rhs.m[1][j]
                    + self.m[i][2] * rhs.m[2][j];
            }
        }
        Affine2 { m }
    }
}
