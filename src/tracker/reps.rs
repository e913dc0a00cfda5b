use std::collections::BTreeMap;

use crate::config::SquatConfig;
use crate::pose::{Body, KeypointIndex};

use super::angle::joint_angle;
use super::identity::rank_identities;
use super::squat::{SquatCounter, SquatPhase};

const LEFT_LEG: [KeypointIndex; 3] = [KeypointIndex::LeftHip, KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle];
const RIGHT_LEG: [KeypointIndex; 3] = [KeypointIndex::RightHip, KeypointIndex::RightKnee, KeypointIndex::RightAnkle];

/// 腰・膝・足首がすべて有効なら膝角度
fn leg_angle(body: &Body, leg: [KeypointIndex; 3]) -> Option<f32> {
    let [hip, knee, ankle] = leg.map(|i| body.get(i));
    (hip.is_valid() && knee.is_valid() && ankle.is_valid()).then(|| joint_angle(hip, knee, ankle))
}

/// 膝角度（度）
///
/// 両脚とも有効なら平均、片脚だけならその脚、どちらも無効なら None
pub fn knee_angle(body: &Body) -> Option<f32> {
    match (leg_angle(body, LEFT_LEG), leg_angle(body, RIGHT_LEG)) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

/// 1人分の集計結果
#[derive(Debug, Clone, PartialEq)]
pub struct PersonReport {
    pub identity: u8,
    pub count: u32,
    pub phase: SquatPhase,
    pub knee_angle: Option<f32>,
}

/// 1フレーム分の集計結果（persons は識別番号順）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub persons: Vec<PersonReport>,
    pub total: u32,
}

/// 識別番号ごとのスクワットカウンタを保持して1フレームずつ集計する
///
/// カウンタは初登場時に作られ、セッション中は破棄されない。一時的に見えなく
/// なった識別番号は、戻ってきたとき既存のカウントから再開する。
pub struct RepCounter {
    config: SquatConfig,
    counters: BTreeMap<u8, SquatCounter>,
}

impl RepCounter {
    pub fn new() -> Self {
        Self::from_config(&SquatConfig::default())
    }

    pub fn from_config(config: &SquatConfig) -> Self {
        Self {
            config: config.clone(),
            counters: BTreeMap::new(),
        }
    }

    pub fn process(&mut self, bodies: &[Body]) -> FrameReport {
        let identities = rank_identities(bodies);
        let mut report = FrameReport::default();

        // rank_identities は先頭 MAX_BODIES 人分だけ返す
        for (body, &identity) in bodies.iter().zip(&identities) {
            let counter = self
                .counters
                .entry(identity)
                .or_insert_with(|| SquatCounter::from_config(&self.config));

            let angle = knee_angle(body);
            let status = match angle {
                Some(a) => counter.update(a),
                None => counter.status(),
            };

            report.total += status.count;
            report.persons.push(PersonReport {
                identity,
                count: status.count,
                phase: status.phase,
                knee_angle: angle,
            });
        }
        report.persons.sort_by_key(|p| p.identity);

        tracing::trace!(persons = report.persons.len(), total = report.total, "frame processed");
        report
    }

    /// 全カウンタを 0 / STANDING に戻す。識別番号自体は保持する
    pub fn reset_all(&mut self) {
        for counter in self.counters.values_mut() {
            counter.reset();
        }
        tracing::info!(identities = self.counters.len(), "all squat counters reset");
    }

    /// これまでに観測された識別番号の数
    pub fn tracked(&self) -> usize {
        self.counters.len()
    }

    pub fn counter(&self, identity: u8) -> Option<&SquatCounter> {
        self.counters.get(&identity)
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new()
    }
}
