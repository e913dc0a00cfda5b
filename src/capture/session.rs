use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::{EstimatedFrame, InferenceSlot, PoseEstimator};
use crate::broadcast::PosePublisher;
use crate::config::SquatConfig;
use crate::protocol::PoseBroadcastMessage;
use crate::tracker::{FrameReport, RepCounter};

/// 1秒ごとのFPS計測
pub struct FpsMeter {
    frames: u32,
    since: Instant,
}

impl FpsMeter {
    pub fn new(now: Instant) -> Self {
        Self { frames: 0, since: now }
    }

    /// 1フレーム記録し、1秒以上経っていればFPSを返してリセット
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.since);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

/// 撮影側のフレームループ
///
/// 毎フレーム: 終わった推論を回収 → レップ集計 → 配信 → 次の推論を開始。
/// レップのカウンタはこのループだけが触る。
pub struct CaptureSession<E, P> {
    slot: InferenceSlot<E>,
    reps: RepCounter,
    publisher: P,
    fps: FpsMeter,
}

impl<E: PoseEstimator, P: PosePublisher> CaptureSession<E, P> {
    pub fn new(estimator: E, publisher: P, squat: &SquatConfig) -> Self {
        Self {
            slot: InferenceSlot::new(estimator),
            reps: RepCounter::from_config(squat),
            publisher,
            fps: FpsMeter::new(Instant::now()),
        }
    }

    /// 1フレーム分進める。新しい推論結果があった場合だけ集計結果を返す
    pub async fn tick(&mut self) -> Result<Option<FrameReport>> {
        let mut report = None;
        match self.slot.try_collect().await {
            Some(Ok(Some(frame))) => report = Some(self.on_frame(frame)),
            Some(Ok(None)) => tracing::trace!("video frame not ready"),
            Some(Err(e)) => tracing::warn!("pose estimation failed: {:#}", e),
            None => {}
        }

        if self.slot.is_lost() {
            bail!("pose estimator is no longer available");
        }
        self.slot.try_start();
        Ok(report)
    }

    fn on_frame(&mut self, frame: EstimatedFrame) -> FrameReport {
        let report = self.reps.process(&frame.bodies);

        if let Some(fps) = self.fps.tick(Instant::now()) {
            let ids: Vec<Option<u32>> = frame.bodies.iter().map(|b| b.id).collect();
            tracing::info!(
                "FPS: {:.0} | Detected {} poses | IDs: {:?} | total reps {}",
                fps,
                frame.bodies.len(),
                ids,
                report.total
            );
        }

        let message = PoseBroadcastMessage::new(frame.bodies, frame.video_width, frame.video_height);
        if let Err(e) = self.publisher.publish(&message) {
            tracing::warn!("pose broadcast failed: {:#}", e);
        }
        report
    }

    pub fn reset_all(&mut self) {
        self.reps.reset_all();
    }

    pub fn reps(&self) -> &RepCounter {
        &self.reps
    }

    /// `frame_interval` 周期でフレームを回す。`shutdown` が完了したら、実行中の
    /// 推論を待ってから終了する
    pub async fn run<F, S>(&mut self, frame_interval: Duration, shutdown: S, mut on_report: F) -> Result<()>
    where
        F: FnMut(&FrameReport),
        S: Future<Output = ()>,
    {
        let mut ticker = interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Some(report) = self.tick().await? {
                        on_report(&report);
                    }
                }
            }
        }

        if let Some(Err(e)) = self.slot.wait().await {
            tracing::debug!("inference in flight at shutdown failed: {:#}", e);
        }
        Ok(())
    }
}
