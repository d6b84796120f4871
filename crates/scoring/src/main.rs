//! Scoring service binary.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use veris_bootstrap::Runtime;
use veris_policy::WeightPolicy;
use veris_scoring::{Calculator, CalculatorHandler, Debouncer, KeySubscriber, ScoringConfig};

/// Scoring service command line arguments.
#[derive(Parser, Debug)]
#[command(name = "veris-scoring")]
#[command(about = "Veris confidence calculator")]
struct Args {
	/// Path to JSON configuration file
	#[arg(long, value_name = "PATH", default_value = "res/config.json")]
	cfg: PathBuf,

	/// Policy classifier to score with
	#[arg(long, default_value = "default")]
	mode: String,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	let cfg: ScoringConfig = veris_config::load(&args.cfg)?;

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			cfg.logging.level()?
		})
		.init();
	tracing::debug!(path = %args.cfg.display(), mode = %args.mode, "config loaded successfully");

	// The policy is resolved once at startup; a provider failure is fatal.
	let provider = veris_policy::new_provider(&cfg.policy);
	let weights = provider.get_weights(&args.mode).await?;
	let policy = WeightPolicy {
		name: args.mode,
		weights,
	};

	let graph = veris_graph::new_graph(&cfg.database);
	let subscriber = veris_pubsub::new_subscriber(cfg.stream.subscriber()?);

	let (keys_tx, keys_rx) = mpsc::unbounded_channel();
	let (quiescent_tx, quiescent_rx) = mpsc::unbounded_channel();

	let calculator = Calculator::new(graph, policy, cfg.engine.clone());

	let runtime = Runtime::new();
	veris_bootstrap::run(
		runtime,
		vec![
			Box::new(KeySubscriber::new(subscriber, keys_tx)),
			Box::new(Debouncer::new(keys_rx, quiescent_tx)),
			Box::new(CalculatorHandler::new(calculator, quiescent_rx)),
		],
	)
	.await?;

	tracing::info!("exiting...");
	Ok(())
}
