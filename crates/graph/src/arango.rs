//! ArangoDB engine over the database's HTTP API.
//!
//! Documents go through `/_api/document`, queries through `/_api/cursor`
//! with bind variables, and graph management through `/_api/gharial`. One
//! client instance is shared across all pipeline tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use veris_config::{ArangoConfig, EdgeInfo};
use veris_contracts::StackLayer;

use crate::documents::{AnnotationDoc, Data, EdgeDoc, EdgeKind, Score, VERTEX_ANNOTATIONS, VERTEX_DATA, VERTEX_SCORES};
use crate::schema;
use crate::store::{GraphError, GraphStore, Result};

/// Graph store backed by ArangoDB.
pub struct ArangoGraph {
	cfg: ArangoConfig,
	client: reqwest::Client,
}

#[derive(Deserialize)]
struct CursorResponse {
	#[serde(default)]
	result: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default, rename = "errorMessage")]
	error_message: String,
}

impl ArangoGraph {
	pub fn new(cfg: ArangoConfig) -> Self {
		Self {
			cfg,
			client: reqwest::Client::new(),
		}
	}

	fn server_url(&self, path: &str) -> String {
		format!("{}{}", self.cfg.provider.uri(), path)
	}

	fn db_url(&self, path: &str) -> String {
		format!("{}/_db/{}{}", self.cfg.provider.uri(), self.cfg.database_name, path)
	}

	/// Declared topology, falling back to the built-in schema when the
	/// configuration leaves it out.
	fn topology(&self) -> (Vec<EdgeInfo>, Vec<String>) {
		let edges = if self.cfg.edges.is_empty() {
			schema::default_edges()
		} else {
			self.cfg.edges.clone()
		};
		let vertexes = if self.cfg.vertexes.is_empty() {
			schema::default_vertexes()
		} else {
			self.cfg.vertexes.clone()
		};
		(edges, vertexes)
	}

	async fn engine_error(response: reqwest::Response, context: &str) -> GraphError {
		let status = response.status();
		let message = match response.json::<ErrorBody>().await {
			Ok(body) if !body.error_message.is_empty() => body.error_message,
			_ => status.to_string(),
		};
		GraphError::Engine(format!("{context}: {message}"))
	}

	/// Run an AQL query and decode each result row.
	async fn cursor<T: DeserializeOwned>(
		&self,
		query: &str,
		bind_vars: serde_json::Value,
	) -> Result<Vec<T>> {
		let response = self
			.client
			.post(self.db_url("/_api/cursor"))
			.json(&json!({
				"query": query,
				"bindVars": bind_vars,
				"batchSize": 1000,
			}))
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(Self::engine_error(response, "cursor query").await);
		}

		let body: CursorResponse = response.json().await?;
		body.result
			.into_iter()
			.map(|row| serde_json::from_value(row).map_err(GraphError::from))
			.collect()
	}

	async fn document_exists(&self, collection: &str, key: &str) -> Result<bool> {
		let response = self
			.client
			.get(self.db_url(&format!("/_api/document/{collection}/{key}")))
			.send()
			.await?;
		match response.status() {
			status if status.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			_ => Err(Self::engine_error(response, "document lookup").await),
		}
	}

	/// Insert a document. A key conflict is only acceptable where the caller
	/// says so (annotation re-delivery).
	async fn create_document<T: Serialize>(
		&self,
		collection: &str,
		doc: &T,
		tolerate_conflict: bool,
	) -> Result<bool> {
		let response = self
			.client
			.post(self.db_url(&format!("/_api/document/{collection}")))
			.json(doc)
			.send()
			.await?;
		match response.status() {
			status if status.is_success() => Ok(true),
			StatusCode::CONFLICT if tolerate_conflict => Ok(false),
			_ => Err(Self::engine_error(response, "document insert").await),
		}
	}

	async fn database_exists(&self) -> Result<bool> {
		#[derive(Deserialize)]
		struct Databases {
			#[serde(default)]
			result: Vec<String>,
		}

		let response = self.client.get(self.server_url("/_api/database")).send().await?;
		if !response.status().is_success() {
			return Err(Self::engine_error(response, "database listing").await);
		}
		let body: Databases = response.json().await?;
		Ok(body.result.contains(&self.cfg.database_name))
	}

	async fn create_database(&self) -> Result<()> {
		let response = self
			.client
			.post(self.server_url("/_api/database"))
			.json(&json!({ "name": self.cfg.database_name }))
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(Self::engine_error(response, "database creation").await);
		}
		Ok(())
	}

	async fn graph_exists(&self) -> Result<bool> {
		let response = self
			.client
			.get(self.db_url(&format!("/_api/gharial/{}", self.cfg.graph_name)))
			.send()
			.await?;
		match response.status() {
			status if status.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			_ => Err(Self::engine_error(response, "graph lookup").await),
		}
	}

	async fn create_graph(&self, edges: &[EdgeInfo]) -> Result<()> {
		let edge_definitions: Vec<serde_json::Value> = edges
			.iter()
			.map(|e| {
				json!({
					"collection": e.collection_name,
					"from": e.from,
					"to": e.to,
				})
			})
			.collect();
		let response = self
			.client
			.post(self.db_url("/_api/gharial"))
			.json(&json!({
				"name": self.cfg.graph_name,
				"edgeDefinitions": edge_definitions,
			}))
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(Self::engine_error(response, "graph creation").await);
		}
		Ok(())
	}

	async fn vertex_collections(&self) -> Result<Vec<String>> {
		#[derive(Deserialize)]
		struct VertexCollections {
			#[serde(default)]
			collections: Vec<String>,
		}

		let response = self
			.client
			.get(self.db_url(&format!("/_api/gharial/{}/vertex", self.cfg.graph_name)))
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(Self::engine_error(response, "vertex collection listing").await);
		}
		let body: VertexCollections = response.json().await?;
		Ok(body.collections)
	}

	async fn create_vertex_collection(&self, name: &str) -> Result<()> {
		let response = self
			.client
			.post(self.db_url(&format!("/_api/gharial/{}/vertex", self.cfg.graph_name)))
			.json(&json!({ "collection": name }))
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(Self::engine_error(response, "vertex collection creation").await);
		}
		Ok(())
	}

	async fn collection_exists(&self, name: &str) -> Result<bool> {
		let response = self
			.client
			.get(self.db_url(&format!("/_api/collection/{name}")))
			.send()
			.await?;
		match response.status() {
			status if status.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			_ => Err(Self::engine_error(response, "collection lookup").await),
		}
	}
}

#[async_trait]
impl GraphStore for ArangoGraph {
	async fn ensure_schema(&self) -> Result<()> {
		let (edges, vertexes) = self.topology();

		if !self.database_exists().await? {
			tracing::debug!(database = %self.cfg.database_name, "creating database");
			self.create_database().await?;
		} else {
			tracing::debug!(database = %self.cfg.database_name, "database exists");
		}

		if self.graph_exists().await? {
			tracing::debug!(graph = %self.cfg.graph_name, "graph exists");
			return Ok(());
		}

		tracing::debug!(graph = %self.cfg.graph_name, "creating graph");
		self.create_graph(&edges).await?;

		let existing = self.vertex_collections().await?;
		for vertex in &vertexes {
			if existing.contains(vertex) {
				tracing::debug!(vertex, "vertex collection exists");
			} else {
				tracing::debug!(vertex, "creating vertex collection");
				self.create_vertex_collection(vertex).await?;
			}
		}
		Ok(())
	}

	async fn validate_schema(&self) -> Result<()> {
		let (edges, vertexes) = self.topology();

		if !self.database_exists().await? {
			return Err(GraphError::Schema(format!(
				"database {} should already exist",
				self.cfg.database_name
			)));
		}
		if !self.graph_exists().await? {
			return Err(GraphError::Schema(format!(
				"graph {} should already exist",
				self.cfg.graph_name
			)));
		}

		for edge in &edges {
			if !self.collection_exists(&edge.collection_name).await? {
				return Err(GraphError::Schema(format!(
					"edge collection {} should already exist",
					edge.collection_name
				)));
			}
		}

		let existing = self.vertex_collections().await?;
		for vertex in &vertexes {
			if !existing.contains(vertex) {
				return Err(GraphError::Schema(format!(
					"vertex collection {vertex} should already exist"
				)));
			}
		}
		Ok(())
	}

	async fn upsert_data(&self, key: &str, timestamp: DateTime<Utc>) -> Result<()> {
		if self.document_exists(VERTEX_DATA, key).await? {
			return Ok(());
		}
		let doc = Data {
			key: key.to_string(),
			timestamp,
		};
		self.create_document(VERTEX_DATA, &doc, true).await?;
		Ok(())
	}

	async fn insert_annotation(&self, doc: &AnnotationDoc) -> Result<()> {
		let created = self.create_document(VERTEX_ANNOTATIONS, doc, true).await?;
		if !created {
			tracing::debug!(key = %doc.key, "duplicate annotation dropped");
		}
		Ok(())
	}

	async fn insert_score(&self, score: &Score) -> Result<()> {
		self.create_document(VERTEX_SCORES, score, false).await?;
		Ok(())
	}

	async fn insert_edge(&self, kind: EdgeKind, from_key: &str, to_key: &str) -> Result<()> {
		let doc = EdgeDoc::new(kind, from_key, to_key);
		self.create_document(kind.collection(), &doc, false).await?;
		Ok(())
	}

	async fn annotations_by_data_ref(&self, key: &str) -> Result<Vec<AnnotationDoc>> {
		self.cursor(
			"FOR a IN annotations FILTER a.dataRef == @key RETURN a",
			json!({ "key": key }),
		)
		.await
	}

	async fn annotations_for_scoring(&self, key: &str) -> Result<Vec<AnnotationDoc>> {
		// Direct annotations first; then, when a prior score of this key has
		// stack neighbours, annotations matching the neighbours' tag sets.
		// Application annotations tied to other data stay excluded.
		let query = r#"
			LET direct = (
				FOR a IN annotations FILTER a.dataRef == @key RETURN a
			)
			LET related = (
				FOR score IN scores FILTER score.dataRef == @key
					SORT score._key DESC LIMIT 1
					FOR v, e IN 1..1 ANY score._id GRAPH @graph
						FILTER IS_SAME_COLLECTION(@stack, e)
						FOR a IN annotations
							FILTER a.tag IN v.tag AND
								(a.layer != @app OR a.dataRef == @key)
							RETURN a
			)
			FOR a IN UNION_DISTINCT(direct, related) RETURN a
		"#;
		self.cursor(
			query,
			json!({
				"key": key,
				"graph": self.cfg.graph_name,
				"stack": EdgeKind::Stack.collection(),
				"app": StackLayer::Application.as_str(),
			}),
		)
		.await
	}

	async fn score_by_tag(&self, tag: &str, layer: &StackLayer) -> Result<Option<Score>> {
		let scores: Vec<Score> = self
			.cursor(
				"FOR s IN scores FILTER s.layer == @layer AND @tag IN s.tag \
				 SORT s._key DESC LIMIT 1 RETURN s",
				json!({ "tag": tag, "layer": layer.as_str() }),
			)
			.await?;
		Ok(scores.into_iter().next())
	}

	async fn latest_score(&self, key: &str) -> Result<Option<Score>> {
		let scores: Vec<Score> = self
			.cursor(
				"FOR s IN scores FILTER s.dataRef == @key SORT s._key DESC LIMIT 1 RETURN s",
				json!({ "key": key }),
			)
			.await?;
		Ok(scores.into_iter().next())
	}

	async fn query_score_by_layer(&self, key: &str, layer: &StackLayer) -> Result<Vec<Score>> {
		let (query, bind_vars) = match layer {
			StackLayer::CiCd => (
				r#"
				FOR appScore IN scores
					FILTER appScore.dataRef == @key AND appScore.layer == @app
					SORT appScore._key DESC LIMIT 1
					FOR s IN scores
						FILTER s.layer == @layer AND s.tag ANY IN appScore.tag
						SORT s._key DESC LIMIT 1
						RETURN s
				"#,
				json!({
					"key": key,
					"layer": layer.as_str(),
					"app": StackLayer::Application.as_str(),
				}),
			),
			StackLayer::Os | StackLayer::Host => (
				r#"
				FOR a IN annotations FILTER a.dataRef == @key LIMIT 1
					FOR s IN scores
						FILTER s.layer == @layer AND a.host IN s.tag
						SORT s._key DESC LIMIT 1
						RETURN s
				"#,
				json!({ "key": key, "layer": layer.as_str() }),
			),
			_ => (
				"FOR s IN scores FILTER s.dataRef == @key AND s.layer == @layer \
				 SORT s._key DESC LIMIT 1 RETURN s",
				json!({ "key": key, "layer": layer.as_str() }),
			),
		};
		self.cursor(query, bind_vars).await
	}

	async fn fetch_hosts(&self) -> Result<Vec<String>> {
		self.cursor(
			"FOR a IN annotations FILTER a.layer == @app RETURN DISTINCT a.host",
			json!({ "app": StackLayer::Application.as_str() }),
		)
		.await
	}
}
