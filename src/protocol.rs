//! Pose broadcast wire format: capture surface → display surface.
//!
//! One JSON datagram per published frame, wrapped in an envelope that carries the
//! channel name. There is no version field; both ends ship together.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::pose::Body;

/// Well-known channel name shared by publisher and subscriber.
pub const POSE_CHANNEL_NAME: &str = "pose-data";

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Snapshot of one frame's poses and video geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseBroadcastMessage {
    pub poses: Vec<Body>,
    /// Sender wall clock, ms since epoch
    pub timestamp: i64,
    pub video_width: u32,
    pub video_height: u32,
}

impl PoseBroadcastMessage {
    /// Stamp a snapshot with the current wall clock.
    pub fn new(poses: Vec<Body>, video_width: u32, video_height: u32) -> Self {
        Self {
            poses,
            timestamp: now_millis(),
            video_width,
            video_height,
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed pose message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encoded message is {len} bytes, datagram limit is {max}")]
    Oversized { len: usize, max: usize },
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    channel: &'a str,
    message: &'a PoseBroadcastMessage,
}

#[derive(Deserialize)]
struct Envelope {
    channel: String,
    message: PoseBroadcastMessage,
}

/// Datagram codec keyed by channel name.
///
/// Each datagram is decoded whole; datagrams addressed to another channel decode
/// to nothing.
#[derive(Debug, Clone)]
pub struct PoseCodec {
    channel: String,
}

impl PoseCodec {
    pub fn new(channel: impl Into<String>) -> Self {
        Self { channel: channel.into() }
    }
}

impl Default for PoseCodec {
    fn default() -> Self {
        Self::new(POSE_CHANNEL_NAME)
    }
}

impl<'a> Encoder<&'a PoseBroadcastMessage> for PoseCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: &'a PoseBroadcastMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = serde_json::to_vec(&EnvelopeRef { channel: &self.channel, message })?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::Oversized { len: data.len(), max: MAX_DATAGRAM_SIZE });
        }
        dst.reserve(data.len());
        dst.put_slice(&data);
        Ok(())
    }
}

impl Decoder for PoseCodec {
    type Item = PoseBroadcastMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // Consume the whole datagram up front so a bad one is never re-read.
        let datagram = src.split();
        let envelope: Envelope = serde_json::from_slice(&datagram)?;
        if envelope.channel != self.channel {
            tracing::trace!(channel = %envelope.channel, "ignoring datagram for another channel");
            return Ok(None);
        }
        Ok(Some(envelope.message))
    }
}
