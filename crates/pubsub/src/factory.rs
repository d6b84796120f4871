//! Transport selection from configuration.

use veris_config::StreamInfo;

use crate::mock::{MockPublisher, MockSubscriber};
use crate::tcp::{TcpPublisher, TcpSubscriber};
use crate::{Publisher, Subscriber};

/// Build the subscriber selected by the stream discriminator.
pub fn new_subscriber(info: &StreamInfo) -> Box<dyn Subscriber> {
	match info {
		StreamInfo::Tcp(cfg) => Box::new(TcpSubscriber::new(cfg.provider.addr())),
		StreamInfo::Mock => Box::new(MockSubscriber),
	}
}

/// Build the publisher selected by the stream discriminator.
pub fn new_publisher(info: &StreamInfo) -> Box<dyn Publisher> {
	match info {
		StreamInfo::Tcp(cfg) => Box::new(TcpPublisher::new(cfg.provider.addr())),
		StreamInfo::Mock => Box::new(MockPublisher),
	}
}
