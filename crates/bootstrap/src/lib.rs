//! Service bootstrap.
//!
//! Every service is a list of [`BootstrapHandler`]s started in order under a
//! single cancellation scope. Each handler spawns its long-running tasks on
//! the shared tracker; [`run`] then waits on that completion barrier until
//! every task has drained after cancellation. SIGINT/SIGTERM are translated
//! into cancellation of the scope.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Shared cancellation scope and completion barrier.
#[derive(Debug, Clone, Default)]
pub struct Runtime {
	shutdown: CancellationToken,
	tasks: TaskTracker,
}

impl Runtime {
	pub fn new() -> Self {
		Self::default()
	}

	/// Token observed by every long-running task. Ticker loops must check it
	/// at each iteration.
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// Spawn a task registered on the completion barrier.
	pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
	where
		F: std::future::Future + Send + 'static,
		F::Output: Send + 'static,
	{
		self.tasks.spawn(future)
	}

	/// Cancel the scope. Idempotent.
	pub fn cancel(&self) {
		self.shutdown.cancel();
	}

	async fn drain(&self) {
		self.tasks.close();
		self.tasks.wait().await;
	}
}

/// One startable component of a service.
#[async_trait]
pub trait BootstrapHandler: Send {
	fn name(&self) -> &'static str;

	/// Perform startup work and spawn the component's long-running tasks on
	/// the runtime. Errors here abort the whole service; once started,
	/// components keep their failures to themselves.
	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()>;
}

/// Start every handler in order, then wait for orderly shutdown.
///
/// A handler failure cancels the scope, drains already-started components,
/// and returns the error.
pub async fn run(runtime: Runtime, handlers: Vec<Box<dyn BootstrapHandler>>) -> anyhow::Result<()> {
	translate_interrupt_to_cancel(&runtime);

	for handler in handlers {
		let name = handler.name();
		if let Err(error) = handler.start(&runtime).await {
			tracing::error!(component = name, error = %error, "startup failed");
			runtime.cancel();
			runtime.drain().await;
			return Err(error);
		}
		tracing::debug!(component = name, "started");
	}

	runtime.drain().await;
	Ok(())
}

/// Translate SIGINT/SIGTERM into cancellation of the scope.
fn translate_interrupt_to_cancel(runtime: &Runtime) {
	let shutdown = runtime.shutdown_token();
	runtime.spawn(async move {
		tokio::select! {
			_ = shutdown.cancelled() => {}
			_ = interrupt() => {
				tracing::info!("interrupt received, shutting down");
				shutdown.cancel();
			}
		}
	});
}

#[cfg(unix)]
async fn interrupt() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = match signal(SignalKind::terminate()) {
		Ok(sigterm) => sigterm,
		Err(e) => {
			tracing::error!(error = %e, "failed to install SIGTERM handler");
			std::future::pending::<()>().await;
			return;
		}
	};
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {}
		_ = sigterm.recv() => {}
	}
}

#[cfg(not(unix))]
async fn interrupt() {
	let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicBool, Ordering};

	use super::*;

	struct Component {
		started: Arc<AtomicBool>,
		stopped: Arc<AtomicBool>,
	}

	#[async_trait]
	impl BootstrapHandler for Component {
		fn name(&self) -> &'static str {
			"component"
		}

		async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
			self.started.store(true, Ordering::SeqCst);
			let shutdown = runtime.shutdown_token();
			let stopped = self.stopped.clone();
			runtime.spawn(async move {
				shutdown.cancelled().await;
				stopped.store(true, Ordering::SeqCst);
			});
			Ok(())
		}
	}

	struct Broken;

	#[async_trait]
	impl BootstrapHandler for Broken {
		fn name(&self) -> &'static str {
			"broken"
		}

		async fn start(self: Box<Self>, _runtime: &Runtime) -> anyhow::Result<()> {
			anyhow::bail!("no database")
		}
	}

	#[tokio::test]
	async fn cancellation_drains_all_tasks() {
		let started = Arc::new(AtomicBool::new(false));
		let stopped = Arc::new(AtomicBool::new(false));
		let runtime = Runtime::new();
		let token = runtime.shutdown_token();

		let component = Box::new(Component {
			started: started.clone(),
			stopped: stopped.clone(),
		});
		let run = tokio::spawn(run(runtime, vec![component]));

		tokio::task::yield_now().await;
		assert!(started.load(Ordering::SeqCst));
		assert!(!stopped.load(Ordering::SeqCst));

		token.cancel();
		run.await.unwrap().unwrap();
		assert!(stopped.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn startup_failure_cancels_started_components() {
		let started = Arc::new(AtomicBool::new(false));
		let stopped = Arc::new(AtomicBool::new(false));
		let runtime = Runtime::new();

		let component = Box::new(Component {
			started: started.clone(),
			stopped: stopped.clone(),
		});
		let result = run(runtime, vec![component, Box::new(Broken)]).await;

		assert!(result.is_err());
		assert!(stopped.load(Ordering::SeqCst));
	}
}
