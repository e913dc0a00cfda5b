//! Capture side: pulls poses from an external estimator, counts reps, publishes.

pub mod replay;
pub mod session;
pub mod synthetic;

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;

use crate::pose::Body;

pub use replay::ReplayEstimator;
pub use session::{CaptureSession, FpsMeter};
pub use synthetic::{posed_body, SyntheticEstimator};

/// 推定器1回分の出力
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatedFrame {
    pub bodies: Vec<Body>,
    pub video_width: u32,
    pub video_height: u32,
}

/// 外部の姿勢推定器（モデル呼び出し）の境界
pub trait PoseEstimator: Send + 'static {
    /// フレームがまだ準備できていなければ `Ok(None)`
    fn estimate(&mut self) -> Result<Option<EstimatedFrame>>;
}

type InferenceTask<E> = JoinHandle<(E, Result<Option<EstimatedFrame>>)>;

/// 推定器を所有し、同時に1回までしか推論を走らせない
///
/// 推論中は推定器ごとブロッキングタスクへ移るので、重複呼び出しは起こりえない。
pub struct InferenceSlot<E> {
    estimator: Option<E>,
    in_flight: Option<InferenceTask<E>>,
}

impl<E: PoseEstimator> InferenceSlot<E> {
    pub fn new(estimator: E) -> Self {
        Self {
            estimator: Some(estimator),
            in_flight: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// 推定器が失われた（推論タスクがパニックした）
    pub fn is_lost(&self) -> bool {
        self.estimator.is_none() && self.in_flight.is_none()
    }

    /// 空いていれば推論を開始する。実行中なら何もせず false
    pub fn try_start(&mut self) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        let Some(mut estimator) = self.estimator.take() else {
            return false;
        };
        self.in_flight = Some(tokio::task::spawn_blocking(move || {
            let result = estimator.estimate();
            (estimator, result)
        }));
        true
    }

    /// 終わった推論の結果を取り出す。実行中・未開始なら None
    pub async fn try_collect(&mut self) -> Option<Result<Option<EstimatedFrame>>> {
        if !self.in_flight.as_ref()?.is_finished() {
            return None;
        }
        let task = self.in_flight.take()?;
        Some(self.finish(task).await)
    }

    /// 実行中の推論を待って結果を取り出す
    pub async fn wait(&mut self) -> Option<Result<Option<EstimatedFrame>>> {
        let task = self.in_flight.take()?;
        Some(self.finish(task).await)
    }

    async fn finish(&mut self, task: InferenceTask<E>) -> Result<Option<EstimatedFrame>> {
        match task.await {
            Ok((estimator, result)) => {
                self.estimator = Some(estimator);
                result
            }
            Err(e) => Err(anyhow!("pose estimator task failed: {e}")),
        }
    }
}
