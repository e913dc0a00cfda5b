//! Left-to-right stable identities.
//!
//! Identities are recomputed from each frame's horizontal positions alone. Two people
//! crossing paths swap labels, and with them the counters their reps accumulate into.
//! Keying by the estimator's track id instead would trade that for the estimator's own
//! id churn; neither is attempted here.

use std::collections::HashMap;

use crate::pose::{Body, Keypoint, KeypointIndex};

/// 1フレームで扱う最大人数
pub const MAX_BODIES: usize = 6;

/// 体幹（肩・腰）のキーポイント
const TORSO: [KeypointIndex; 4] = [
    KeypointIndex::LeftShoulder,
    KeypointIndex::RightShoulder,
    KeypointIndex::LeftHip,
    KeypointIndex::RightHip,
];

/// track key → stable identity (1-based)
pub type IdentityMap = HashMap<u32, u8>;

fn mean_x<'a>(points: impl Iterator<Item = &'a Keypoint>) -> Option<f32> {
    let (sum, n) = points.fold((0.0f32, 0usize), |(s, n), kp| (s + kp.x, n + 1));
    (n > 0).then(|| sum / n as f32)
}

/// 水平方向のアンカー位置
///
/// 体幹 → 鼻 → 全有効キーポイントの順にフォールバックし、何も無ければ 0
pub fn center_x(body: &Body) -> f32 {
    if let Some(x) = mean_x(TORSO.iter().map(|&i| body.get(i)).filter(|k| k.is_valid())) {
        return x;
    }

    let nose = body.get(KeypointIndex::Nose);
    if nose.is_valid() {
        return nose.x;
    }

    mean_x(body.valid_keypoints()).unwrap_or(0.0)
}

/// 入力の並びごとに左から順の識別番号 1..=N を返す
///
/// 先頭 `MAX_BODIES` 人だけが対象で、返り値の長さは `min(len, MAX_BODIES)`。
/// トラックIDは見ないので、IDの重複や欠落があっても番号は衝突しない。
pub fn rank_identities(bodies: &[Body]) -> Vec<u8> {
    let retained = &bodies[..bodies.len().min(MAX_BODIES)];

    let mut order: Vec<(usize, f32)> = retained
        .iter()
        .enumerate()
        .map(|(i, b)| (i, center_x(b)))
        .collect();
    // sort_by は安定ソート: 同じ位置なら入力順を維持
    order.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut identities = vec![0u8; retained.len()];
    for (rank, &(index, _)) in order.iter().enumerate() {
        identities[index] = rank as u8 + 1;
    }
    identities
}

/// トラックID → 識別番号のマップ
///
/// キーはトラックID、無ければ入力リスト上のインデックス。キーが重なった場合は
/// 後の要素が上書きする。フレーム内の集計には `rank_identities` を使うこと。
pub fn assign_identities(bodies: &[Body]) -> IdentityMap {
    rank_identities(bodies)
        .into_iter()
        .enumerate()
        .map(|(index, identity)| (bodies[index].track_key(index), identity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body_at(x: f32, id: Option<u32>) -> Body {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for idx in TORSO {
            keypoints[idx as usize] = Keypoint::new(x, 200.0, 0.9);
        }
        Body::new(keypoints, id, 0.8)
    }

    #[test]
    fn test_left_to_right_order() {
        let bodies = vec![body_at(500.0, Some(10)), body_at(100.0, Some(11)), body_at(300.0, Some(12))];
        let map = assign_identities(&bodies);
        assert_eq!(map[&11], 1);
        assert_eq!(map[&12], 2);
        assert_eq!(map[&10], 3);
    }

    #[test]
    fn test_torso_average() {
        let mut body = body_at(0.0, None);
        body.keypoints[KeypointIndex::LeftShoulder as usize] = Keypoint::new(100.0, 0.0, 0.9);
        body.keypoints[KeypointIndex::RightShoulder as usize] = Keypoint::new(200.0, 0.0, 0.9);
        body.keypoints[KeypointIndex::LeftHip as usize] = Keypoint::new(999.0, 0.0, 0.1);
        body.keypoints[KeypointIndex::RightHip as usize] = Keypoint::new(999.0, 0.0, 0.1);
        assert_eq!(center_x(&body), 150.0);
    }

    #[test]
    fn test_nose_fallback() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::Nose as usize] = Keypoint::new(42.0, 10.0, 0.5);
        keypoints[KeypointIndex::LeftWrist as usize] = Keypoint::new(300.0, 10.0, 0.9);
        assert_eq!(center_x(&Body::new(keypoints, None, 0.5)), 42.0);
    }

    #[test]
    fn test_any_valid_fallback() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::LeftWrist as usize] = Keypoint::new(100.0, 10.0, 0.9);
        keypoints[KeypointIndex::RightAnkle as usize] = Keypoint::new(300.0, 10.0, 0.4);
        assert_eq!(center_x(&Body::new(keypoints, None, 0.5)), 200.0);
    }

    #[test]
    fn test_nothing_valid_is_zero() {
        let mut keypoints = [Keypoint::new(500.0, 500.0, 0.1); KeypointIndex::COUNT];
        keypoints[0].score = 0.0;
        assert_eq!(center_x(&Body::new(keypoints, None, 0.1)), 0.0);
    }

    #[test]
    fn test_missing_track_id_uses_list_index() {
        let bodies = vec![body_at(400.0, None), body_at(100.0, None)];
        let map = assign_identities(&bodies);
        assert_eq!(map[&0], 2);
        assert_eq!(map[&1], 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let bodies = vec![body_at(250.0, Some(7)), body_at(250.0, Some(3)), body_at(250.0, Some(5))];
        let map = assign_identities(&bodies);
        assert_eq!(map[&7], 1);
        assert_eq!(map[&3], 2);
        assert_eq!(map[&5], 3);
    }

    #[test]
    fn test_excess_bodies_are_dropped() {
        // 7人目（最も左）は入力順で切り捨てられる
        let mut bodies: Vec<Body> = (0..6).map(|i| body_at(100.0 + i as f32 * 50.0, Some(i))).collect();
        bodies.push(body_at(0.0, Some(99)));
        let map = assign_identities(&bodies);
        assert_eq!(map.len(), MAX_BODIES);
        assert!(!map.contains_key(&99));
        assert_eq!(map[&0], 1);
    }

    #[test]
    fn test_rank_identities_by_position_in_list() {
        let bodies = [body_at(500.0, None), body_at(100.0, None), body_at(300.0, None)];
        assert_eq!(rank_identities(&bodies), vec![3, 1, 2]);
        assert!(rank_identities(&[]).is_empty());
    }

    #[test]
    fn test_untracked_next_to_track_id_zero_do_not_collide() {
        // 1人目は ID 無し（キー 0）、2人目はトラックID 0
        let bodies = [body_at(100.0, None), body_at(400.0, Some(0))];
        assert_eq!(rank_identities(&bodies), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_track_ids_do_not_collide() {
        let bodies = [body_at(300.0, Some(4)), body_at(100.0, Some(4)), body_at(200.0, Some(4))];
        assert_eq!(rank_identities(&bodies), vec![3, 1, 2]);
    }

    #[test]
    fn test_rank_identities_truncates() {
        let bodies: Vec<Body> = (0..9).map(|i| body_at(900.0 - i as f32 * 100.0, None)).collect();
        assert_eq!(rank_identities(&bodies), vec![6, 5, 4, 3, 2, 1]);
    }

    proptest! {
        #[test]
        fn prop_identities_are_a_permutation(xs in prop::collection::vec(0.0f32..1920.0, 0..12)) {
            let bodies: Vec<Body> = xs.iter().enumerate().map(|(i, &x)| body_at(x, Some(i as u32))).collect();
            let map = assign_identities(&bodies);
            let n = xs.len().min(MAX_BODIES);

            let mut ids: Vec<u8> = map.values().copied().collect();
            ids.sort_unstable();
            let expected: Vec<u8> = (1..=n as u8).collect();
            prop_assert_eq!(ids, expected.clone());

            // ID がすべて同じでも位置ごとの番号は順列になる
            let same_id: Vec<Body> = xs.iter().map(|&x| body_at(x, Some(0))).collect();
            let mut ranked = rank_identities(&same_id);
            ranked.sort_unstable();
            prop_assert_eq!(ranked, expected);
        }

        #[test]
        fn prop_identity_is_monotonic_in_center_x(xs in prop::collection::vec(0.0f32..1920.0, 1..=6)) {
            let bodies: Vec<Body> = xs.iter().enumerate().map(|(i, &x)| body_at(x, Some(i as u32))).collect();
            let map = assign_identities(&bodies);
            for (i, a) in xs.iter().enumerate() {
                for (j, b) in xs.iter().enumerate() {
                    if a < b {
                        prop_assert!(map[&(i as u32)] < map[&(j as u32)]);
                    }
                }
            }
        }
    }
}
