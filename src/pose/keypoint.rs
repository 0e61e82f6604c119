/// 全身ランドマークの33キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        const ALL: [LandmarkIndex; LandmarkIndex::COUNT] = [
            LandmarkIndex::Nose,
            LandmarkIndex::LeftEyeInner,
            LandmarkIndex::LeftEye,
            LandmarkIndex::LeftEyeOuter,
            LandmarkIndex::RightEyeInner,
            LandmarkIndex::RightEye,
            LandmarkIndex::RightEyeOuter,
            LandmarkIndex::LeftEar,
            LandmarkIndex::RightEar,
            LandmarkIndex::MouthLeft,
            LandmarkIndex::MouthRight,
            LandmarkIndex::LeftShoulder,
            LandmarkIndex::RightShoulder,
            LandmarkIndex::LeftElbow,
            LandmarkIndex::RightElbow,
            LandmarkIndex::LeftWrist,
            LandmarkIndex::RightWrist,
            LandmarkIndex::LeftPinky,
            LandmarkIndex::RightPinky,
            LandmarkIndex::LeftIndex,
            LandmarkIndex::RightIndex,
            LandmarkIndex::LeftThumb,
            LandmarkIndex::RightThumb,
            LandmarkIndex::LeftHip,
            LandmarkIndex::RightHip,
            LandmarkIndex::LeftKnee,
            LandmarkIndex::RightKnee,
            LandmarkIndex::LeftAnkle,
            LandmarkIndex::RightAnkle,
            LandmarkIndex::LeftHeel,
            LandmarkIndex::RightHeel,
            LandmarkIndex::LeftFootIndex,
            LandmarkIndex::RightFootIndex,
        ];
        ALL.get(index).copied()
    }
}

/// 単一ランドマーク（表示座標系）
///
/// x, y は画像中心原点・画像高さで正規化した表示座標（yは上向き）。
/// z は画像高さで正規化した奥行きオフセット。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// visibilityとpresenceが両方閾値を超えた場合のみtrue
    pub visible: bool,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visible: bool) -> Self {
        Self { x, y, z, visible }
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visible: false,
        }
    }
}

/// 33ランドマークからなる姿勢
#[derive(Debug, Clone)]
pub struct Pose {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl Pose {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    /// インデックスでランドマークを取得
    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// 可視ランドマーク数
    pub fn visible_count(&self) -> usize {
        self.landmarks.iter().filter(|lm| lm.visible).count()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}

/// 画像空間の点を表示座標に変換する
///
/// 画像中心を原点に移し、縦横とも画像高さで割る（アスペクト比を保存）。
pub fn to_display(point: [f32; 2], image_width: u32, image_height: u32) -> [f32; 2] {
    let w = image_width as f32;
    let h = image_height as f32;
    [(point[0] - 0.5 * w) / h, (point[1] - 0.5 * h) / h]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(23), Some(LandmarkIndex::LeftHip));
        assert_eq!(
            LandmarkIndex::from_index(32),
            Some(LandmarkIndex::RightFootIndex)
        );
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_pose_get() {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.1, 0.2, 0.0, true);

        let pose = Pose::new(landmarks);
        let nose = pose.get(LandmarkIndex::Nose);
        assert_eq!(nose.x, 0.1);
        assert_eq!(nose.y, 0.2);
        assert!(nose.visible);
    }

    #[test]
    fn test_pose_visible_count() {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[0] = Landmark::new(0.0, 0.0, 0.0, true);
        landmarks[5] = Landmark::new(0.0, 0.0, 0.0, true);
        assert_eq!(Pose::new(landmarks).visible_count(), 2);
        assert_eq!(Pose::default().visible_count(), 0);
    }

    #[test]
    fn test_to_display_center_is_origin() {
        assert_eq!(to_display([320.0, 240.0], 640, 480), [0.0, 0.0]);
    }

    #[test]
    fn test_to_display_aspect_correct() {
        // 640x480: 横方向は高さで割るため ±2/3 が画像端になる
        let corner = to_display([640.0, 480.0], 640, 480);
        assert!((corner[0] - 640.0 / 2.0 / 480.0).abs() < 1e-6);
        assert!((corner[1] - 0.5).abs() < 1e-6);
    }
}
