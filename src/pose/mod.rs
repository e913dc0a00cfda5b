pub mod keypoint;

pub use keypoint::{Body, Keypoint, KeypointIndex, MIN_KEYPOINT_SCORE};
