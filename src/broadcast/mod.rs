//! Best-effort pose channels.
//!
//! Publishing is fire-and-forget: no acknowledgement, no backpressure, and a missing
//! or slow subscriber simply never sees the message.

pub mod local;
pub mod udp;

use std::future::Future;

use anyhow::Result;

use crate::protocol::PoseBroadcastMessage;

pub use local::{local_channel, LocalPublisher, LocalSubscriber};
pub use udp::{UdpPublisher, UdpSubscriber};

/// Sending end of a pose channel.
pub trait PosePublisher {
    fn publish(&mut self, message: &PoseBroadcastMessage) -> Result<()>;
}

/// Receiving end of a pose channel.
pub trait PoseSubscriber {
    /// Next message, or `None` once the channel is gone.
    fn recv(&mut self) -> impl Future<Output = Option<PoseBroadcastMessage>> + Send;
}
