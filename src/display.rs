//! Passive display side of the pose broadcast.
//!
//! The display keeps only the latest snapshot. Silence from the publisher for longer
//! than the liveness timeout means "disconnected" and clears the poses; an empty
//! snapshot means "connected, nobody in view".

use std::time::Duration;

use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

use crate::broadcast::PoseSubscriber;
use crate::config::LivenessConfig;
use crate::pose::Body;
use crate::protocol::PoseBroadcastMessage;
use crate::tracker::rank_identities;

/// 受信前の動画サイズ
const DEFAULT_VIDEO_SIZE: (u32, u32) = (640, 480);

pub struct DisplayState {
    poses: Vec<Body>,
    video_width: u32,
    video_height: u32,
    connected: bool,
    last_update: Option<Instant>,
    timeout: Duration,
}

impl DisplayState {
    pub fn new(timeout: Duration) -> Self {
        Self {
            poses: Vec::new(),
            video_width: DEFAULT_VIDEO_SIZE.0,
            video_height: DEFAULT_VIDEO_SIZE.1,
            connected: false,
            last_update: None,
            timeout,
        }
    }

    pub fn from_config(config: &LivenessConfig) -> Self {
        Self::new(config.timeout())
    }

    /// 受信した内容で表示状態を丸ごと置き換える。切断状態から復帰したら true
    pub fn on_message(&mut self, message: PoseBroadcastMessage, now: Instant) -> bool {
        let reconnected = !self.connected;
        self.poses = message.poses;
        self.video_width = message.video_width;
        self.video_height = message.video_height;
        self.connected = true;
        self.last_update = Some(now);
        reconnected
    }

    /// 最終受信から timeout を超えていたら切断扱いにする。今回切断したら true
    pub fn check_liveness(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_update else {
            return false;
        };
        if self.connected && now.saturating_duration_since(last) > self.timeout {
            self.connected = false;
            self.poses.clear();
            return true;
        }
        false
    }

    pub fn poses(&self) -> &[Body] {
        &self.poses
    }

    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn video_size(&self) -> (u32, u32) {
        (self.video_width, self.video_height)
    }

    /// 表示中の姿勢と識別番号の組（左から順の番号は送信側と同じ計算）
    pub fn labeled_poses(&self) -> Vec<(u8, &Body)> {
        let mut labeled: Vec<(u8, &Body)> = rank_identities(&self.poses)
            .into_iter()
            .zip(&self.poses)
            .collect();
        labeled.sort_by_key(|(identity, _)| *identity);
        labeled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// 最初の受信、または切断からの復帰
    Connected,
    Updated,
    Disconnected,
}

/// Subscriber plus the periodic liveness check, driven from one task.
pub struct DisplayLoop<S> {
    subscriber: S,
    state: DisplayState,
    ticker: Interval,
}

impl<S: PoseSubscriber> DisplayLoop<S> {
    pub fn new(subscriber: S, config: &LivenessConfig) -> Self {
        let mut ticker = interval(config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            subscriber,
            state: DisplayState::from_config(config),
            ticker,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Waits for the next visible change. `None` once the channel is closed.
    pub async fn next_event(&mut self) -> Option<DisplayEvent> {
        loop {
            tokio::select! {
                message = self.subscriber.recv() => {
                    let message = message?;
                    let reconnected = self.state.on_message(message, Instant::now());
                    if reconnected {
                        tracing::info!(poses = self.state.pose_count(), "publisher connected");
                        return Some(DisplayEvent::Connected);
                    }
                    return Some(DisplayEvent::Updated);
                }
                _ = self.ticker.tick() => {
                    if self.state.check_liveness(Instant::now()) {
                        tracing::info!("no poses for {:?}, publisher disconnected", self.state.timeout);
                        return Some(DisplayEvent::Disconnected);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{local_channel, PosePublisher};

    fn message(n: usize) -> PoseBroadcastMessage {
        PoseBroadcastMessage::new(vec![Body::default(); n], 1280, 720)
    }

    #[test]
    fn test_initial_state() {
        let state = DisplayState::new(Duration::from_millis(3000));
        assert!(!state.is_connected());
        assert_eq!(state.pose_count(), 0);
        assert_eq!(state.video_size(), (640, 480));
    }

    #[test]
    fn test_message_replaces_view() {
        let mut state = DisplayState::new(Duration::from_millis(3000));
        let t0 = Instant::now();
        assert!(state.on_message(message(3), t0));
        assert_eq!(state.pose_count(), 3);
        assert_eq!(state.video_size(), (1280, 720));

        assert!(!state.on_message(message(1), t0 + Duration::from_millis(30)));
        assert_eq!(state.pose_count(), 1);
        assert!(state.is_connected());
    }

    #[test]
    fn test_silence_past_timeout_disconnects() {
        let mut state = DisplayState::new(Duration::from_millis(3000));
        let t0 = Instant::now();
        state.on_message(message(2), t0);

        assert!(!state.check_liveness(t0 + Duration::from_millis(3000)));
        assert!(state.is_connected());

        assert!(state.check_liveness(t0 + Duration::from_millis(3001)));
        assert!(!state.is_connected());
        assert_eq!(state.pose_count(), 0);

        // 二重に通知しない
        assert!(!state.check_liveness(t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn test_message_just_before_timeout_keeps_connection() {
        let mut state = DisplayState::new(Duration::from_millis(3000));
        let t0 = Instant::now();
        state.on_message(message(2), t0);
        state.on_message(message(2), t0 + Duration::from_millis(2999));

        assert!(!state.check_liveness(t0 + Duration::from_millis(4000)));
        assert!(state.is_connected());
        assert_eq!(state.pose_count(), 2);
    }

    #[test]
    fn test_empty_snapshot_is_still_connected() {
        let mut state = DisplayState::new(Duration::from_millis(3000));
        let t0 = Instant::now();
        state.on_message(message(0), t0);
        assert!(state.is_connected());
        assert!(!state.check_liveness(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_labels_are_distinct_for_shared_track_ids() {
        use crate::capture::posed_body;

        let mut state = DisplayState::new(Duration::from_millis(3000));
        let poses = vec![
            posed_body(400.0, 170.0, Some(0)),
            posed_body(100.0, 170.0, None),
            posed_body(250.0, 170.0, Some(0)),
        ];
        state.on_message(PoseBroadcastMessage::new(poses, 640, 480), Instant::now());

        let labeled: Vec<(u8, f32)> = state
            .labeled_poses()
            .into_iter()
            .map(|(identity, body)| (identity, body.get(crate::pose::KeypointIndex::Nose).x))
            .collect();
        assert_eq!(labeled, vec![(1, 100.0), (2, 250.0), (3, 400.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_reports_connect_and_disconnect() {
        let config = LivenessConfig { timeout_ms: 3000, poll_interval_ms: 1000 };
        let (mut publisher, subscriber) = local_channel(8);
        let mut display = DisplayLoop::new(subscriber, &config);

        publisher.publish(&message(2)).unwrap();
        assert_eq!(display.next_event().await, Some(DisplayEvent::Connected));
        assert_eq!(display.state().pose_count(), 2);

        publisher.publish(&message(1)).unwrap();
        assert_eq!(display.next_event().await, Some(DisplayEvent::Updated));

        let started = Instant::now();
        assert_eq!(display.next_event().await, Some(DisplayEvent::Disconnected));
        let waited = started.elapsed();
        assert!(waited > Duration::from_millis(3000) && waited <= Duration::from_millis(4000), "{:?}", waited);
        assert_eq!(display.state().pose_count(), 0);

        publisher.publish(&message(1)).unwrap();
        assert_eq!(display.next_event().await, Some(DisplayEvent::Connected));

        drop(publisher);
        assert_eq!(display.next_event().await, None);
    }
}
