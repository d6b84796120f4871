//! Projector service binary.

use std::path::PathBuf;

use clap::Parser;
use veris_bootstrap::Runtime;
use veris_projector::{Projector, ProjectorConfig, ProjectorHandler};

/// Projector service command line arguments.
#[derive(Parser, Debug)]
#[command(name = "veris-projector")]
#[command(about = "Veris confidence projector")]
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
	let cfg: ProjectorConfig = veris_config::load(&args.cfg)?;

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			cfg.logging.level()?
		})
		.init();
	tracing::debug!(path = %args.cfg.display(), "config loaded successfully");

	let graph = veris_graph::new_graph(&cfg.database);
	let records = veris_records::new_records(&cfg.records);
	let projector = Projector::new(graph, records, cfg.hash.kind.clone());

	let runtime = Runtime::new();
	veris_bootstrap::run(runtime, vec![Box::new(ProjectorHandler::new(projector))]).await?;

	tracing::info!("exiting...");
	Ok(())
}
