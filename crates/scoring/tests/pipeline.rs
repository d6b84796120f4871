//! End-to-end pipeline scenarios over the in-process engines: ingest
//! messages through the graph writer, score through the calculator, and
//! check the resulting graph.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_contracts::{Annotation, AnnotationList, HashKind, MessageAction, StackLayer, SubscribeWrapper};
use veris_graph::{AnnotationDoc, EdgeKind, GraphStore, MemoryGraph, Score};
use veris_ingest::Writer;
use veris_policy::{Weight, WeightPolicy};
use veris_scoring::{Calculator, CalculatorHandler, EngineSettings, WORKER_MAX};

fn annotation(id: &str, key: &str, layer: StackLayer, kind: &str, satisfied: bool) -> Annotation {
	Annotation {
		id: id.to_string(),
		key: key.to_string(),
		hash: HashKind::Sha256,
		host: String::new(),
		tag: String::new(),
		layer,
		kind: kind.to_string(),
		signature: String::new(),
		is_satisfied: satisfied,
		timestamp: Utc::now(),
	}
}

fn message(action: MessageAction, items: Vec<Annotation>) -> SubscribeWrapper {
	SubscribeWrapper {
		message_type: "annotations".to_string(),
		action,
		content: serde_json::to_vec(&AnnotationList { items }).unwrap(),
	}
}

fn policy(weights: &[(&str, u32)]) -> WeightPolicy {
	WeightPolicy {
		name: "default".to_string(),
		weights: weights
			.iter()
			.map(|(k, v)| Weight {
				annotation_key: k.to_string(),
				value: *v,
			})
			.collect(),
	}
}

#[tokio::test]
async fn single_leaf_layer_create_is_scored() {
	let graph = Arc::new(MemoryGraph::new());
	let writer = Writer::new(graph.clone());
	let calculator = Calculator::new(
		graph.clone(),
		policy(&[("tpm", 5), ("tls", 3)]),
		EngineSettings::immediate(),
	);

	let key = writer
		.handle(&message(
			MessageAction::Create,
			vec![
				annotation("01HA", "K", StackLayer::Host, "tpm", true),
				annotation("01HB", "K", StackLayer::Host, "tls", false),
			],
		))
		.await
		.unwrap();
	assert_eq!(key.as_deref(), Some("K"));

	calculator.score("K").await;

	let score = graph.latest_score("K").await.unwrap().expect("score written");
	assert_eq!(score.passed, 1);
	assert_eq!(score.count, 2);
	assert_eq!(score.confidence, 0.63);
	assert_eq!(score.layer, StackLayer::Host);
	assert_eq!(score.tag, vec![String::new()]);

	let scoring = graph.edges(EdgeKind::Scoring);
	assert_eq!(scoring.len(), 1);
	assert_eq!(scoring[0].from, format!("scores/{}", score.key));
	assert_eq!(scoring[0].to, "data/K");
}

#[tokio::test]
async fn composite_application_score_uses_cicd_confidence() {
	let graph = Arc::new(MemoryGraph::new());
	let writer = Writer::new(graph.clone());
	let calculator = Calculator::new(
		graph.clone(),
		policy(&[("src", 10)]),
		EngineSettings::immediate(),
	);

	// Pre-populated ci/cd score for tag "T" with confidence 0.80.
	let cicd = Score {
		key: Score::mint_key(),
		data_ref: "pipeline".to_string(),
		passed: 4,
		count: 5,
		policy: "default".to_string(),
		confidence: 0.80,
		timestamp: Utc::now(),
		tag: vec!["T".to_string()],
		layer: StackLayer::CiCd,
	};
	graph.insert_score(&cicd).await.unwrap();

	let mut app = annotation("01HX", "K", StackLayer::Application, "src", true);
	app.tag = "T".to_string();
	app.host = "H".to_string();
	writer
		.handle(&message(MessageAction::Create, vec![app]))
		.await
		.unwrap();

	calculator.score("K").await;

	// localConfidence 1.0 × tagFactor 0.80; no host-layer score for H.
	let score = graph.latest_score("K").await.unwrap().expect("score written");
	assert_eq!(score.confidence, 0.80);
	assert_eq!(score.layer, StackLayer::Application);

	let stack = graph.edges(EdgeKind::Stack);
	assert_eq!(stack.len(), 1);
	assert_eq!(stack[0].from, format!("scores/{}", cicd.key));
	assert_eq!(stack[0].to, format!("scores/{}", score.key));
}

#[tokio::test]
async fn mutate_scores_the_successor() {
	let graph = Arc::new(MemoryGraph::new());
	let writer = Writer::new(graph.clone());
	let calculator =
		Calculator::new(graph.clone(), policy(&[]), EngineSettings::immediate());

	let key = writer
		.handle(&message(
			MessageAction::Mutate,
			vec![
				annotation("", "K0", StackLayer::Application, "source", false),
				annotation("01HM", "K1", StackLayer::Application, "pub", true),
			],
		))
		.await
		.unwrap();
	assert_eq!(key.as_deref(), Some("K1"));

	calculator.score("K1").await;

	let score = graph.latest_score("K1").await.unwrap().expect("score written");
	assert_eq!(score.count, 1);
	assert_eq!(score.confidence, 1.0);
	assert!(graph.latest_score("K0").await.unwrap().is_none());
}

#[tokio::test]
async fn redelivery_yields_the_same_confidence() {
	let graph = Arc::new(MemoryGraph::new());
	let writer = Writer::new(graph.clone());
	let calculator = Calculator::new(
		graph.clone(),
		policy(&[("tpm", 5), ("tls", 3)]),
		EngineSettings::immediate(),
	);

	let wrapper = message(
		MessageAction::Create,
		vec![
			annotation("01HA", "K", StackLayer::Host, "tpm", true),
			annotation("01HB", "K", StackLayer::Host, "tls", false),
		],
	);
	writer.handle(&wrapper).await.unwrap();
	calculator.score("K").await;
	writer.handle(&wrapper).await.unwrap();
	calculator.score("K").await;

	// The score history is append-only, but every version agrees.
	let scores: Vec<_> = graph
		.scores()
		.into_iter()
		.filter(|s| s.data_ref == "K")
		.collect();
	assert_eq!(scores.len(), 2);
	assert!(scores.iter().all(|s| s.confidence == 0.63 && s.count == 2));
}

#[tokio::test]
async fn key_with_no_annotations_writes_no_score() {
	let graph = Arc::new(MemoryGraph::new());
	let calculator =
		Calculator::new(graph.clone(), policy(&[]), EngineSettings::immediate());

	calculator.score("ghost").await;
	assert!(graph.scores().is_empty());
	assert!(graph.edges(EdgeKind::Scoring).is_empty());
}

#[tokio::test(start_paused = true)]
async fn worker_pool_respects_the_bound() {
	let graph = Arc::new(MemoryGraph::new());

	// Twenty keys, each with one annotation ready to score.
	let mut keys = Vec::new();
	for i in 0..20 {
		let key = format!("K{i}");
		graph
			.insert_annotation(&AnnotationDoc {
				key: format!("a{i}"),
				data_ref: key.clone(),
				hash: HashKind::Sha256,
				host: String::new(),
				tag: String::new(),
				layer: StackLayer::Host,
				kind: "tpm".to_string(),
				signature: String::new(),
				is_satisfied: true,
				timestamp: Utc::now(),
			})
			.await
			.unwrap();
		keys.push(key);
	}

	let calculator = Calculator::new(
		graph.clone(),
		policy(&[]),
		EngineSettings {
			scoring_latency_floor_ms: 1500,
		},
	);
	let (quiescent_tx, quiescent_rx) = mpsc::unbounded_channel();
	let handler = Box::new(CalculatorHandler::new(calculator, quiescent_rx));
	let workers = handler.workers();

	let runtime = Runtime::new();
	handler.start(&runtime).await.unwrap();

	let started = tokio::time::Instant::now();
	for key in keys {
		quiescent_tx.send(key).unwrap();
	}

	while graph.scores().len() < 20 {
		tokio::time::sleep(Duration::from_millis(100)).await;
	}

	// ceil(20 / 5) waves of the 1.5s settling floor.
	assert!(started.elapsed() >= Duration::from_millis(6000));
	assert!(started.elapsed() < Duration::from_millis(9000));
	assert_eq!(workers.peak(), WORKER_MAX);

	// Let the final wave release its slots.
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(workers.count(), 0);

	runtime.cancel();
}
