use anyhow::Result;
use tokio::sync::broadcast;

use super::{PosePublisher, PoseSubscriber};
use crate::protocol::PoseBroadcastMessage;

/// In-process channel for a publisher and any number of subscribers.
pub fn local_channel(capacity: usize) -> (LocalPublisher, LocalSubscriber) {
    let (tx, rx) = broadcast::channel(capacity.max(1));
    (LocalPublisher { tx }, LocalSubscriber { rx })
}

#[derive(Clone)]
pub struct LocalPublisher {
    tx: broadcast::Sender<PoseBroadcastMessage>,
}

impl LocalPublisher {
    pub fn subscribe(&self) -> LocalSubscriber {
        LocalSubscriber { rx: self.tx.subscribe() }
    }
}

impl PosePublisher for LocalPublisher {
    fn publish(&mut self, message: &PoseBroadcastMessage) -> Result<()> {
        // No subscriber is not an error
        let _ = self.tx.send(message.clone());
        Ok(())
    }
}

pub struct LocalSubscriber {
    rx: broadcast::Receiver<PoseBroadcastMessage>,
}

impl PoseSubscriber for LocalSubscriber {
    async fn recv(&mut self) -> Option<PoseBroadcastMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscriber lagged, skipping to newer poses");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
