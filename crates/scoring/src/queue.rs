//! Work queue and worker accounting for the scoring engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Unbounded FIFO of keys awaiting a scoring worker.
///
/// Flow control comes from the debouncer window upstream, not from this
/// queue.
#[derive(Debug, Default)]
pub struct WorkQueue {
	items: Mutex<VecDeque<String>>,
}

impl WorkQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&self, key: String) {
		self.items.lock().unwrap().push_back(key);
	}

	pub fn len(&self) -> usize {
		self.items.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.lock().unwrap().is_empty()
	}

	pub fn pop_first(&self) -> Option<String> {
		self.items.lock().unwrap().pop_front()
	}
}

/// Active-worker counter with a wakeup for the dispatcher.
#[derive(Debug, Default)]
pub struct Workers {
	active: AtomicUsize,
	peak: AtomicUsize,
	freed: Notify,
}

impl Workers {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn count(&self) -> usize {
		self.active.load(Ordering::SeqCst)
	}

	/// Highest concurrent worker count observed.
	pub fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}

	/// Claim a worker slot. The slot is released on drop, surviving panics
	/// and cancellation, and signals the dispatcher that capacity freed up.
	pub fn acquire(self: &Arc<Self>) -> WorkerSlot {
		let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(active, Ordering::SeqCst);
		WorkerSlot {
			workers: self.clone(),
		}
	}

	/// Wait until some worker releases its slot.
	pub async fn freed(&self) {
		self.freed.notified().await;
	}
}

/// RAII guard for one claimed worker slot.
pub struct WorkerSlot {
	workers: Arc<Workers>,
}

impl Drop for WorkerSlot {
	fn drop(&mut self) {
		self.workers.active.fetch_sub(1, Ordering::SeqCst);
		self.workers.freed.notify_one();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn queue_is_fifo() {
		let queue = WorkQueue::new();
		queue.append("a".to_string());
		queue.append("b".to_string());
		assert_eq!(queue.len(), 2);
		assert_eq!(queue.pop_first().as_deref(), Some("a"));
		assert_eq!(queue.pop_first().as_deref(), Some("b"));
		assert!(queue.pop_first().is_none());
		assert!(queue.is_empty());
	}

	#[tokio::test]
	async fn slots_release_on_drop_and_signal() {
		let workers = Workers::new();
		let slot_a = workers.acquire();
		let slot_b = workers.acquire();
		assert_eq!(workers.count(), 2);
		assert_eq!(workers.peak(), 2);

		let waiter = {
			let workers = workers.clone();
			tokio::spawn(async move { workers.freed().await })
		};
		tokio::task::yield_now().await;

		drop(slot_a);
		waiter.await.unwrap();
		assert_eq!(workers.count(), 1);

		drop(slot_b);
		assert_eq!(workers.count(), 0);
		assert_eq!(workers.peak(), 2);
	}
}
