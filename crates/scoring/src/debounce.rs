//! Key deduplication and debouncing.
//!
//! One inbound message is often only the first of several annotations for a
//! data item; the rest arrive milliseconds later as the pipeline progresses.
//! Scoring must see each key once, after its annotations have settled: keys
//! are held in a last-seen map and released only after they have been quiet
//! for the polling interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use veris_bootstrap::{BootstrapHandler, Runtime};

/// How often the map is polled for quiescent keys.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// How long a key must stay quiet before it is released.
pub const POLLING_INTERVAL: Duration = Duration::from_millis(2000);

/// Map of pending keys to the instant they were last seen.
#[derive(Debug, Default)]
pub struct KeyMap {
	items: Mutex<HashMap<String, Instant>>,
}

impl KeyMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record a sighting of `key`. Adding and refreshing are the same
	/// assignment, which is what deduplicates bursts.
	pub fn add(&self, key: &str) {
		let mut items = self.items.lock().unwrap();
		items.insert(key.to_string(), Instant::now());
	}

	/// Collect and remove every key that has been quiet for at least
	/// `interval`.
	pub fn poll(&self, interval: Duration) -> Vec<String> {
		let mut items = self.items.lock().unwrap();
		let now = Instant::now();
		let found: Vec<String> = items
			.iter()
			.filter(|(_, last_seen)| now.duration_since(**last_seen) >= interval)
			.map(|(key, _)| key.clone())
			.collect();
		for key in &found {
			items.remove(key);
		}
		found
	}

	pub fn len(&self) -> usize {
		self.items.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.lock().unwrap().is_empty()
	}
}

// In-flight keys are deliberately not persisted; on shutdown they are
// dropped and will be rescored when their annotations next arrive.

/// Bootstrap component between the key intake and the scoring engine.
pub struct Debouncer {
	keys: mpsc::UnboundedReceiver<String>,
	quiescent: mpsc::UnboundedSender<String>,
}

impl Debouncer {
	pub fn new(
		keys: mpsc::UnboundedReceiver<String>,
		quiescent: mpsc::UnboundedSender<String>,
	) -> Self {
		Self { keys, quiescent }
	}
}

#[async_trait]
impl BootstrapHandler for Debouncer {
	fn name(&self) -> &'static str {
		"debouncer"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		let map = Arc::new(KeyMap::new());

		// Intake: every sighting refreshes the key's timestamp.
		let intake_map = map.clone();
		let mut keys = self.keys;
		let intake_shutdown = runtime.shutdown_token();
		runtime.spawn(async move {
			loop {
				tokio::select! {
					_ = intake_shutdown.cancelled() => return,
					received = keys.recv() => match received {
						Some(key) => intake_map.add(&key),
						None => return,
					},
				}
			}
		});

		// Ticker: release quiescent keys downstream, one at a time.
		let quiescent = self.quiescent;
		let shutdown = runtime.shutdown_token();
		runtime.spawn(async move {
			loop {
				tokio::select! {
					_ = shutdown.cancelled() => break,
					_ = tokio::time::sleep(TICK_INTERVAL) => {
						for key in map.poll(POLLING_INTERVAL) {
							if quiescent.send(key).is_err() {
								return;
							}
						}
					}
				}
			}
			// Dropping `quiescent` closes the downstream channel.
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn poll_releases_only_quiet_keys() {
		let map = KeyMap::new();
		map.add("K1");
		tokio::time::advance(Duration::from_millis(1500)).await;
		map.add("K2");

		tokio::time::advance(Duration::from_millis(600)).await;
		// K1 has been quiet for 2.1s, K2 only 0.6s.
		assert_eq!(map.poll(POLLING_INTERVAL), vec!["K1".to_string()]);
		assert_eq!(map.len(), 1);

		tokio::time::advance(Duration::from_millis(1400)).await;
		assert_eq!(map.poll(POLLING_INTERVAL), vec!["K2".to_string()]);
		assert!(map.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn add_refreshes_the_quiet_window() {
		let map = KeyMap::new();
		map.add("K");
		tokio::time::advance(Duration::from_millis(1900)).await;
		map.add("K");
		tokio::time::advance(Duration::from_millis(1900)).await;
		assert!(map.poll(POLLING_INTERVAL).is_empty());
		tokio::time::advance(Duration::from_millis(100)).await;
		assert_eq!(map.poll(POLLING_INTERVAL), vec!["K".to_string()]);
	}

	#[tokio::test(start_paused = true)]
	async fn burst_is_collapsed_to_one_emission() {
		let (keys_tx, keys_rx) = mpsc::unbounded_channel();
		let (quiescent_tx, mut quiescent_rx) = mpsc::unbounded_channel();

		let runtime = Runtime::new();
		Box::new(Debouncer::new(keys_rx, quiescent_tx))
			.start(&runtime)
			.await
			.unwrap();

		let started = Instant::now();
		keys_tx.send("K".to_string()).unwrap();
		tokio::time::sleep(Duration::from_millis(500)).await;
		keys_tx.send("K".to_string()).unwrap();
		tokio::time::sleep(Duration::from_millis(700)).await;
		keys_tx.send("K".to_string()).unwrap();

		let released = quiescent_rx.recv().await.unwrap();
		assert_eq!(released, "K");
		// No sooner than 2s after the last sighting at t=1.2s.
		assert!(started.elapsed() >= Duration::from_millis(3200));

		// Exactly once.
		tokio::time::sleep(Duration::from_secs(5)).await;
		assert!(quiescent_rx.try_recv().is_err());

		runtime.cancel();
	}
}
