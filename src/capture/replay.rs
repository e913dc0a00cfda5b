use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{EstimatedFrame, PoseEstimator};
use crate::pose::Body;

/// 記録ファイルの1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedFrame {
    pub poses: Vec<Body>,
    pub video_width: u32,
    pub video_height: u32,
}

/// 記録済みの姿勢（JSON Lines）を順に返す。最後まで行ったら先頭に戻る
///
/// 配信メッセージをそのまま1行ずつ保存したファイルも読める（余分なフィールドは無視）。
#[derive(Debug)]
pub struct ReplayEstimator {
    frames: Vec<RecordedFrame>,
    cursor: usize,
}

impl ReplayEstimator {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid recording {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let frames = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| serde_json::from_str(line).with_context(|| format!("line {}", i + 1)))
            .collect::<Result<Vec<RecordedFrame>>>()?;
        if frames.is_empty() {
            bail!("recording has no frames");
        }
        tracing::info!("loaded {} recorded frames", frames.len());
        Ok(Self { frames, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl PoseEstimator for ReplayEstimator {
    fn estimate(&mut self) -> Result<Option<EstimatedFrame>> {
        let frame = &self.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(Some(EstimatedFrame {
            bodies: frame.poses.clone(),
            video_width: frame.video_width,
            video_height: frame.video_height,
        }))
    }
}
