use crate::pose::{Body, KeypointIndex};

/// 骨格の接続定義 (COCO 17点)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 16] = {
    use KeypointIndex::*;
    [
        // 頭
        (Nose, LeftEye),
        (Nose, RightEye),
        (LeftEye, LeftEar),
        (RightEye, RightEar),
        // 肩・腕
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        // 胴体・腰
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftHip, RightHip),
        // 脚
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
    ]
};

/// 識別番号 1〜6 のキャラクター色 (RGB)
pub const CHARACTER_COLORS: [u32; 6] = [
    0xFF0000, // 赤
    0xFFA500, // オレンジ
    0xFFD700, // 金（黄色だと見えにくい）
    0x00CC00, // 緑
    0x0066FF, // 青
    0x800080, // 紫
];

/// 識別番号の色。範囲外は両端に丸める
pub fn character_color(identity: u8) -> u32 {
    let idx = (identity.max(1) as usize - 1).min(CHARACTER_COLORS.len() - 1);
    CHARACTER_COLORS[idx]
}

/// 動画座標 → 描画先座標の変換
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub video_width: u32,
    pub video_height: u32,
    pub width: u32,
    pub height: u32,
    /// 左右反転（鏡像表示）
    pub mirrored: bool,
}

impl Viewport {
    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let sx = self.width as f32 / self.video_width.max(1) as f32;
        let sy = self.height as f32 / self.video_height.max(1) as f32;
        let px = x * sx;
        let px = if self.mirrored { self.width as f32 - px } else { px };
        (px, y * sy)
    }
}

/// 描画する骨1本（描画先座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

/// 両端が有効な骨だけを描画先座標で返す
pub fn visible_bones(body: &Body, viewport: &Viewport) -> Vec<Segment> {
    SKELETON_CONNECTIONS
        .iter()
        .filter_map(|&(a, b)| {
            let (ka, kb) = (body.get(a), body.get(b));
            (ka.is_valid() && kb.is_valid()).then(|| Segment {
                from: viewport.map(ka.x, ka.y),
                to: viewport.map(kb.x, kb.y),
            })
        })
        .collect()
}
