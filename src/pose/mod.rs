pub mod anchors;
pub mod crop;
pub mod detection;
pub mod keypoint;
pub mod landmarker;
pub mod preprocess;

pub use anchors::{AnchorError, AnchorTable, POSE_ANCHOR_COUNT};
pub use crop::{
    detector_transform, resolve_crop, CropWindow, DETECTOR_INPUT_SIZE, LANDMARKER_INPUT_SIZE,
};
pub use detection::{BoxOffsets, DetectionResult, PoseDetector};
pub use keypoint::{to_display, Landmark, LandmarkIndex, Pose};
pub use landmarker::{project_landmarks, PoseLandmarker, LANDMARK_VALUES};
pub use preprocess::sample_affine;
