use std::f32::consts::PI;
use std::time::Instant;

use anyhow::Result;

use super::{EstimatedFrame, PoseEstimator};
use crate::pose::{Body, Keypoint, KeypointIndex};

const VIDEO_WIDTH: u32 = 640;
const VIDEO_HEIGHT: u32 = 480;

/// スクワット1回の周期（秒）
const CYCLE_SECS: f32 = 2.5;
/// 最も深いときの膝角度
const DEEPEST_ANGLE: f32 = 90.0;
/// 立っているときの膝角度
const STANDING_ANGLE: f32 = 175.0;

/// 膝角度 `knee_angle` で x に立つ人の姿勢（動画ピクセル座標、全点有効）
pub fn posed_body(x: f32, knee_angle: f32, id: Option<u32>) -> Body {
    let theta = knee_angle.to_radians();
    // しゃがむほど腰が下がる
    let drop = (STANDING_ANGLE - knee_angle).max(0.0) * 0.6;
    let hip_y = 260.0 + drop;
    let knee_y = hip_y + 90.0;
    let shin = 90.0;

    let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
    let mut set = |idx: KeypointIndex, kx: f32, ky: f32| {
        keypoints[idx as usize] = Keypoint::new(kx, ky, 0.9);
    };

    set(KeypointIndex::Nose, x, hip_y - 180.0);
    set(KeypointIndex::LeftEye, x + 8.0, hip_y - 188.0);
    set(KeypointIndex::RightEye, x - 8.0, hip_y - 188.0);
    set(KeypointIndex::LeftEar, x + 16.0, hip_y - 184.0);
    set(KeypointIndex::RightEar, x - 16.0, hip_y - 184.0);

    for side in [1.0f32, -1.0] {
        let left = side > 0.0;
        let pick = |l: KeypointIndex, r: KeypointIndex| if left { l } else { r };
        let sx = x + side * 20.0;

        set(pick(KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder), x + side * 30.0, hip_y - 140.0);
        set(pick(KeypointIndex::LeftElbow, KeypointIndex::RightElbow), x + side * 40.0, hip_y - 80.0);
        set(pick(KeypointIndex::LeftWrist, KeypointIndex::RightWrist), x + side * 45.0, hip_y - 25.0);
        set(pick(KeypointIndex::LeftHip, KeypointIndex::RightHip), sx, hip_y);
        set(pick(KeypointIndex::LeftKnee, KeypointIndex::RightKnee), sx, knee_y);
        // 膝→腰が真上のとき、膝→足首は膝角度ぶん回転した向き
        set(
            pick(KeypointIndex::LeftAnkle, KeypointIndex::RightAnkle),
            sx + shin * theta.sin(),
            knee_y - shin * theta.cos(),
        );
    }

    Body::new(keypoints, id, 0.9)
}

/// カメラもモデルも使わずに、その場でスクワットする人たちを生成する
pub struct SyntheticEstimator {
    people: usize,
    started: Instant,
}

impl SyntheticEstimator {
    pub fn new(people: usize) -> Self {
        Self {
            people,
            started: Instant::now(),
        }
    }

    /// 開始から `t` 秒後のフレーム
    ///
    /// トラックIDは右から振るので、左から順の識別番号とは一致しない。
    pub fn frame_at(&self, t: f32) -> EstimatedFrame {
        let spacing = VIDEO_WIDTH as f32 / (self.people + 1) as f32;
        let bodies = (0..self.people)
            .map(|i| {
                // 人ごとに位相をずらす
                let phase = 2.0 * PI * (t / CYCLE_SECS) + i as f32 * 0.9;
                let depth = 0.5 - 0.5 * phase.cos();
                let angle = STANDING_ANGLE - (STANDING_ANGLE - DEEPEST_ANGLE) * depth;
                let track_id = (self.people - i) as u32;
                posed_body(spacing * (i + 1) as f32, angle, Some(track_id))
            })
            .collect();

        EstimatedFrame {
            bodies,
            video_width: VIDEO_WIDTH,
            video_height: VIDEO_HEIGHT,
        }
    }
}

impl PoseEstimator for SyntheticEstimator {
    fn estimate(&mut self) -> Result<Option<EstimatedFrame>> {
        Ok(Some(self.frame_at(self.started.elapsed().as_secs_f32())))
    }
}
