//! Newline-delimited JSON frames over TCP.
//!
//! A subscriber binds the configured endpoint and accepts any number of
//! producer connections; a publisher holds one connection to a downstream
//! listener and reconnects lazily when it drops.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use veris_contracts::{PublishWrapper, SubscribeWrapper};

use crate::{Publisher, Subscriber, TransportError};

/// Per-message publish timeout.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Listening subscriber for line-JSON frames.
pub struct TcpSubscriber {
	addr: String,
	listener: Option<TcpListener>,
}

impl TcpSubscriber {
	pub fn new(addr: String) -> Self {
		Self {
			addr,
			listener: None,
		}
	}

	/// Bind eagerly. Useful when the caller needs the resolved local address
	/// before the pump starts (tests bind port 0).
	pub async fn bind(addr: &str) -> std::io::Result<Self> {
		let listener = TcpListener::bind(addr).await?;
		Ok(Self {
			addr: addr.to_string(),
			listener: Some(listener),
		})
	}

	pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
		self.listener.as_ref().and_then(|l| l.local_addr().ok())
	}
}

#[async_trait]
impl Subscriber for TcpSubscriber {
	async fn run(
		self: Box<Self>,
		messages: mpsc::UnboundedSender<SubscribeWrapper>,
		shutdown: CancellationToken,
	) -> Result<(), TransportError> {
		let listener = match self.listener {
			Some(listener) => listener,
			None => TcpListener::bind(&self.addr).await?,
		};
		tracing::info!(addr = %self.addr, "stream subscriber listening");

		loop {
			tokio::select! {
				_ = shutdown.cancelled() => break,
				accepted = listener.accept() => match accepted {
					Ok((stream, peer)) => {
						tracing::debug!(%peer, "producer connected");
						let messages = messages.clone();
						let shutdown = shutdown.clone();
						let (reader, _writer) = stream.into_split();
						tokio::spawn(async move {
							read_frames(reader, messages, shutdown).await;
							tracing::debug!(%peer, "producer disconnected");
						});
					}
					Err(e) => {
						tracing::error!(error = %e, "failed to accept producer connection");
					}
				},
			}
		}

		// Dropping `messages` here closes the downstream channel.
		Ok(())
	}
}

/// Read frames off one producer connection until it closes or shutdown.
async fn read_frames(
	reader: OwnedReadHalf,
	messages: mpsc::UnboundedSender<SubscribeWrapper>,
	shutdown: CancellationToken,
) {
	let mut lines = BufReader::new(reader).lines();
	loop {
		let line = tokio::select! {
			_ = shutdown.cancelled() => return,
			line = lines.next_line() => line,
		};
		match line {
			Ok(Some(line)) => {
				if line.trim().is_empty() {
					continue;
				}
				match serde_json::from_str::<SubscribeWrapper>(&line) {
					Ok(wrapper) => {
						if messages.send(wrapper).is_err() {
							return;
						}
					}
					Err(e) => {
						tracing::error!(error = %e, "dropping undecodable frame");
					}
				}
			}
			Ok(None) => return,
			Err(e) => {
				tracing::error!(error = %e, "producer connection read failed");
				return;
			}
		}
	}
}

/// Connecting publisher for line-JSON frames.
pub struct TcpPublisher {
	addr: String,
	conn: Mutex<Option<TcpStream>>,
}

impl TcpPublisher {
	pub fn new(addr: String) -> Self {
		Self {
			addr,
			conn: Mutex::new(None),
		}
	}

	/// Connect if the held connection has been dropped.
	async fn reconnect(
		&self,
		conn: &mut Option<TcpStream>,
	) -> Result<(), TransportError> {
		if conn.is_none() {
			let stream = TcpStream::connect(&self.addr).await?;
			tracing::debug!(addr = %self.addr, "publisher connected");
			*conn = Some(stream);
		}
		Ok(())
	}
}

#[async_trait]
impl Publisher for TcpPublisher {
	async fn publish(&self, message: &PublishWrapper) -> Result<(), TransportError> {
		let mut frame = serde_json::to_vec(message)?;
		frame.push(b'\n');

		let mut conn = self.conn.lock().await;
		self.reconnect(&mut conn).await?;
		let stream = conn.as_mut().ok_or(TransportError::Closed)?;

		let write = async {
			stream.write_all(&frame).await?;
			stream.flush().await
		};
		match tokio::time::timeout(PUBLISH_TIMEOUT, write).await {
			Ok(Ok(())) => Ok(()),
			Ok(Err(e)) => {
				// Drop the connection so the next publish reconnects.
				*conn = None;
				Err(TransportError::Io(e))
			}
			Err(_) => {
				*conn = None;
				Err(TransportError::Timeout(PUBLISH_TIMEOUT))
			}
		}
	}

	async fn close(&self) {
		let mut conn = self.conn.lock().await;
		if let Some(mut stream) = conn.take() {
			let _ = stream.shutdown().await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn publish_reaches_subscriber() {
		let subscriber = Box::new(TcpSubscriber::bind("127.0.0.1:0").await.unwrap());
		let addr = subscriber.local_addr().unwrap();

		let (tx, mut rx) = mpsc::unbounded_channel();
		let shutdown = CancellationToken::new();
		let pump = tokio::spawn(subscriber.run(tx, shutdown.clone()));

		let publisher = TcpPublisher::new(addr.to_string());
		publisher
			.publish(&PublishWrapper::calculate_score("key-1"))
			.await
			.unwrap();

		let received = rx.recv().await.expect("frame delivered");
		assert_eq!(received.message_type, veris_contracts::MSG_CALCULATE_SCORE);
		assert_eq!(received.content, b"key-1");

		publisher.close().await;
		shutdown.cancel();
		pump.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn undecodable_frames_are_skipped() {
		let subscriber = Box::new(TcpSubscriber::bind("127.0.0.1:0").await.unwrap());
		let addr = subscriber.local_addr().unwrap();

		let (tx, mut rx) = mpsc::unbounded_channel();
		let shutdown = CancellationToken::new();
		let pump = tokio::spawn(subscriber.run(tx, shutdown.clone()));

		let mut raw = TcpStream::connect(addr).await.unwrap();
		raw.write_all(b"not json\n").await.unwrap();
		raw.write_all(b"{\"messageType\":\"CalculateScore\",\"content\":\"a2V5LTI=\"}\n")
			.await
			.unwrap();
		raw.flush().await.unwrap();

		let received = rx.recv().await.expect("valid frame delivered");
		assert_eq!(received.content, b"key-2");

		shutdown.cancel();
		pump.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn publisher_reports_unreachable_endpoint() {
		let publisher = TcpPublisher::new("127.0.0.1:1".to_string());
		let result = publisher.publish(&PublishWrapper::calculate_score("key")).await;
		assert!(result.is_err());
	}
}
