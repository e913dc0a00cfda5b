//! Pose channel over UDP datagrams, for surfaces running as separate processes.
//!
//! No server: the publisher sends to a fixed address, the subscriber binds it.
//! With a multicast address any number of subscribers can join the group.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket};

use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::StreamExt;
use tokio::net::UdpSocket;
use tokio_util::codec::Encoder;
use tokio_util::udp::UdpFramed;

use super::{PosePublisher, PoseSubscriber};
use crate::protocol::{PoseBroadcastMessage, PoseCodec};

fn parse_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse().with_context(|| format!("invalid broadcast address: {addr}"))
}

pub struct UdpPublisher {
    socket: StdUdpSocket,
    target: SocketAddr,
    codec: PoseCodec,
    buf: BytesMut,
}

impl UdpPublisher {
    pub fn new(target: &str, channel: &str) -> Result<Self> {
        let target = parse_addr(target)?;
        let bind: SocketAddr = match target.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => "[::]:0".parse()?,
        };
        let socket = StdUdpSocket::bind(bind).context("failed to bind publisher socket")?;
        // フレームループを止めない。送信バッファが詰まったらそのフレームは捨てる
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            target,
            codec: PoseCodec::new(channel),
            buf: BytesMut::new(),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl PosePublisher for UdpPublisher {
    fn publish(&mut self, message: &PoseBroadcastMessage) -> Result<()> {
        self.buf.clear();
        self.codec.encode(message, &mut self.buf)?;
        match self.socket.send_to(&self.buf, self.target) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                tracing::debug!("send buffer full, dropping pose frame");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct UdpSubscriber {
    framed: UdpFramed<PoseCodec>,
    local_addr: SocketAddr,
}

impl UdpSubscriber {
    pub async fn bind(addr: &str, channel: &str) -> Result<Self> {
        let addr = parse_addr(addr)?;
        let socket = match addr.ip() {
            IpAddr::V4(group) if group.is_multicast() => {
                let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, addr.port())).await?;
                socket
                    .join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
                    .with_context(|| format!("failed to join multicast group {group}"))?;
                socket
            }
            _ => UdpSocket::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?,
        };
        let local_addr = socket.local_addr()?;
        tracing::debug!(%local_addr, channel, "pose subscriber bound");

        Ok(Self {
            framed: UdpFramed::new(socket, PoseCodec::new(channel)),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl PoseSubscriber for UdpSubscriber {
    async fn recv(&mut self) -> Option<PoseBroadcastMessage> {
        loop {
            match self.framed.next().await {
                Some(Ok((message, _from))) => return Some(message),
                Some(Err(e)) => tracing::warn!("dropping pose datagram: {}", e),
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_datagram_reaches_subscriber() {
        let mut subscriber = UdpSubscriber::bind("127.0.0.1:0", "pose-data").await.unwrap();
        let target = subscriber.local_addr().to_string();
        let mut publisher = UdpPublisher::new(&target, "pose-data").unwrap();

        let message = PoseBroadcastMessage::new(vec![Default::default(); 3], 1280, 720);
        publisher.publish(&message).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, message);
    }

    #[tokio::test]
    async fn test_foreign_channel_and_garbage_are_skipped() {
        let mut subscriber = UdpSubscriber::bind("127.0.0.1:0", "pose-data").await.unwrap();
        let target = subscriber.local_addr();

        let raw = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        raw.send_to(b"garbage", target).unwrap();
        UdpPublisher::new(&target.to_string(), "elsewhere")
            .unwrap()
            .publish(&PoseBroadcastMessage::new(Vec::new(), 1, 1))
            .unwrap();
        let wanted = PoseBroadcastMessage::new(vec![Default::default()], 640, 480);
        UdpPublisher::new(&target.to_string(), "pose-data").unwrap().publish(&wanted).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, wanted);
    }

    #[test]
    fn test_publish_without_subscriber_does_not_block() {
        // 受信側がいなくても publish はすぐ返る
        let mut publisher = UdpPublisher::new("127.0.0.1:9", "pose-data").unwrap();
        let message = PoseBroadcastMessage::new(vec![Default::default(); 4], 640, 480);
        let started = std::time::Instant::now();
        for _ in 0..1000 {
            let _ = publisher.publish(&message);
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(publisher.target().port(), 9);
    }

    #[test]
    fn test_invalid_address() {
        assert!(UdpPublisher::new("not-an-address", "pose-data").is_err());
    }
}
