use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::protocol::POSE_CHANNEL_NAME;
use crate::tracker::squat::{SQUAT_DOWN_THRESHOLD, SQUAT_UP_THRESHOLD};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub squat: SquatConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquatConfig {
    /// 膝角度がこれ未満でしゃがみ（度）
    #[serde(default = "default_down_threshold")]
    pub down_threshold: f32,
    /// 膝角度がこれを超えると立位に戻り1回（度）
    #[serde(default = "default_up_threshold")]
    pub up_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// チャネル名（送受信で共通）
    #[serde(default = "default_channel")]
    pub channel: String,
    /// 送信先 / 受信バインド先。マルチキャストアドレスも可
    #[serde(default = "default_broadcast_addr")]
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LivenessConfig {
    /// 無受信がこれを超えたら切断扱い（ミリ秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 切断チェックの周期（ミリ秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// "synthetic" または JSON Lines 録画ファイルのパス
    #[serde(default = "default_source")]
    pub source: String,
    /// synthetic 時の人数
    #[serde(default = "default_people")]
    pub people: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_width")]
    pub width: u32,
    #[serde(default = "default_display_height")]
    pub height: u32,
    /// 左右反転表示（鏡像）
    #[serde(default = "default_mirrored")]
    pub mirrored: bool,
}

fn default_down_threshold() -> f32 { SQUAT_DOWN_THRESHOLD }
fn default_up_threshold() -> f32 { SQUAT_UP_THRESHOLD }
fn default_channel() -> String { POSE_CHANNEL_NAME.to_string() }
fn default_broadcast_addr() -> String { "127.0.0.1:47800".to_string() }
fn default_timeout_ms() -> u64 { 3000 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_target_fps() -> u32 { 30 }
fn default_source() -> String { "synthetic".to_string() }
fn default_people() -> usize { 2 }
fn default_display_width() -> u32 { 960 }
fn default_display_height() -> u32 { 540 }
fn default_mirrored() -> bool { true }

impl Default for SquatConfig {
    fn default() -> Self {
        Self {
            down_threshold: default_down_threshold(),
            up_threshold: default_up_threshold(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            addr: default_broadcast_addr(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl LivenessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            source: default_source(),
            people: default_people(),
        }
    }
}

impl CaptureConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_display_width(),
            height: default_display_height(),
            mirrored: default_mirrored(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// 読めなければデフォルト値で続行
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }
}
