use crate::pose::Keypoint;

/// 3点のなす角（度）。`vertex` が頂点
///
/// vertex→a と vertex→b の極角の差の絶対値を取り、180度を超えたら反転して
/// 0〜180 に収める。スコアの検査はしないので、呼び出し側で有効な点だけを渡すこと。
pub fn joint_angle(a: &Keypoint, vertex: &Keypoint, b: &Keypoint) -> f32 {
    let radians = f32::atan2(b.y - vertex.y, b.x - vertex.x)
        - f32::atan2(a.y - vertex.y, a.x - vertex.x);

    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
