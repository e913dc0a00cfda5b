use crate::config::SquatConfig;

/// しゃがみ判定の閾値（膝角度がこれ未満で SQUATTING）
pub const SQUAT_DOWN_THRESHOLD: f32 = 120.0;
/// 立ち上がり判定の閾値（膝角度がこれを超えると STANDING、1回カウント）
pub const SQUAT_UP_THRESHOLD: f32 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SquatPhase {
    #[default]
    Standing,
    Squatting,
}

impl SquatPhase {
    /// 表示用の短いラベル
    pub fn label(self) -> &'static str {
        match self {
            Self::Standing => "UP",
            Self::Squatting => "DOWN",
        }
    }
}

/// `SquatCounter::update` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquatStatus {
    pub count: u32,
    pub phase: SquatPhase,
}

/// 膝角度に対するヒステリシス付きスクワットカウンタ
///
/// 下降と上昇で閾値を分け、その間の不感帯では状態を変えない。
/// 1回のカウントは STANDING → SQUATTING → STANDING の完了時のみ。
#[derive(Debug, Clone)]
pub struct SquatCounter {
    down_threshold: f32,
    up_threshold: f32,
    count: u32,
    phase: SquatPhase,
}

impl SquatCounter {
    pub fn new() -> Self {
        Self::with_thresholds(SQUAT_DOWN_THRESHOLD, SQUAT_UP_THRESHOLD)
    }

    pub fn with_thresholds(down_threshold: f32, up_threshold: f32) -> Self {
        Self {
            down_threshold,
            up_threshold,
            count: 0,
            phase: SquatPhase::Standing,
        }
    }

    pub fn from_config(config: &SquatConfig) -> Self {
        Self::with_thresholds(config.down_threshold, config.up_threshold)
    }

    pub fn update(&mut self, knee_angle: f32) -> SquatStatus {
        match self.phase {
            SquatPhase::Standing if knee_angle < self.down_threshold => {
                self.phase = SquatPhase::Squatting;
            }
            SquatPhase::Squatting if knee_angle > self.up_threshold => {
                self.phase = SquatPhase::Standing;
                self.count += 1;
            }
            _ => {}
        }
        self.status()
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.phase = SquatPhase::Standing;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn phase(&self) -> SquatPhase {
        self.phase
    }

    pub fn status(&self) -> SquatStatus {
        SquatStatus {
            count: self.count,
            phase: self.phase,
        }
    }
}

impl Default for SquatCounter {
    fn default() -> Self {
        Self::new()
    }
}
