use serde::{Deserialize, Serialize};

/// キーポイントを有効とみなす最小スコア
pub const MIN_KEYPOINT_SCORE: f32 = 0.3;

/// MoveNet の 17 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;
}

/// 単一キーポイント（動画ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    #[serde(default)]
    pub score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    /// スコアが `MIN_KEYPOINT_SCORE` 以上か
    pub fn is_valid(&self) -> bool {
        self.score >= MIN_KEYPOINT_SCORE
    }
}

/// 1フレーム内で検出された1人分の姿勢
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
    /// 推定器が付与するフレーム毎のトラックID（不安定、再利用されうる）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default)]
    pub score: f32,
}

impl Body {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT], id: Option<u32>, score: f32) -> Self {
        Self { keypoints, id, score }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    /// 有効なキーポイントだけを返す
    pub fn valid_keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter().filter(|k| k.is_valid())
    }

    /// 識別番号のマップを引くキー。トラックIDが無ければフレーム内の並び順
    pub fn track_key(&self, index: usize) -> u32 {
        self.id.unwrap_or(index as u32)
    }
}
