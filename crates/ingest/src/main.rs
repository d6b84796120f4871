//! Ingest service binary.
//!
//! Annotation stream in, graph mutations plus scoring keys out.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use veris_bootstrap::Runtime;
use veris_ingest::{GraphWriter, IngestConfig, KeyPublisher, StreamSubscriber};

/// Ingest service command line arguments.
#[derive(Parser, Debug)]
#[command(name = "veris-ingest")]
#[command(about = "Veris annotation subscriber and graph writer")]
struct Args {
	/// Path to JSON configuration file
	#[arg(long, value_name = "PATH", default_value = "res/config.json")]
	cfg: PathBuf,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	let cfg: IngestConfig = veris_config::load(&args.cfg)?;

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			cfg.logging.level()?
		})
		.init();
	tracing::debug!(path = %args.cfg.display(), "config loaded successfully");

	let graph = veris_graph::new_graph(&cfg.database);
	let subscriber = veris_pubsub::new_subscriber(cfg.stream.subscriber()?);
	let publisher = veris_pubsub::new_publisher(cfg.stream.publisher()?);

	let (messages_tx, messages_rx) = mpsc::unbounded_channel();
	let (keys_tx, keys_rx) = mpsc::unbounded_channel();

	let runtime = Runtime::new();
	veris_bootstrap::run(
		runtime,
		vec![
			Box::new(StreamSubscriber::new(subscriber, messages_tx)),
			Box::new(GraphWriter::new(graph, messages_rx, keys_tx)),
			Box::new(KeyPublisher::new(publisher, keys_rx)),
		],
	)
	.await?;

	tracing::info!("exiting...");
	Ok(())
}
