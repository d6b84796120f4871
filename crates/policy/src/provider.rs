//! Policy providers.
//!
//! Weights either come straight from configuration (`local`) or from an
//! open-policy service queried over HTTP (`opa`). Both are reached through
//! the [`PolicyProvider`] trait; the variant is selected by the `type`
//! discriminator of the policy section.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veris_config::ServiceInfo;

use crate::weights::{Weight, WeightPolicy};

/// Errors raised while resolving policy weights.
#[derive(Debug, Error)]
pub enum PolicyError {
	#[error("no policy registered for classifier {0}")]
	UnknownClassifier(String),

	#[error("policy provider request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("policy provider returned an empty result set")]
	EmptyResponse,
}

/// Fetches the weight vector registered under a classifier.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
	async fn get_weights(&self, classifier: &str) -> Result<Vec<Weight>, PolicyError>;
}

/// Policy section of a service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum PolicyInfo {
	Local(LocalPolicyConfig),
	#[serde(rename = "opa")]
	Open(OpenPolicyConfig),
}

/// Weights embedded directly in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPolicyConfig {
	#[serde(default)]
	pub weights: Vec<WeightPolicy>,
}

/// Endpoint of an open-policy weights service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPolicyConfig {
	pub provider: ServiceInfo,
	pub weights: OpaWeightsInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaWeightsInfo {
	pub path: String,
}

/// Build the provider selected by the policy section.
pub fn new_provider(info: &PolicyInfo) -> Box<dyn PolicyProvider> {
	match info {
		PolicyInfo::Local(cfg) => Box::new(LocalPolicyProvider::new(cfg.weights.clone())),
		PolicyInfo::Open(cfg) => Box::new(OpenPolicyProvider::new(cfg.clone())),
	}
}

/// Provider backed by policies loaded from configuration.
pub struct LocalPolicyProvider {
	policies: Vec<WeightPolicy>,
}

impl LocalPolicyProvider {
	pub fn new(policies: Vec<WeightPolicy>) -> Self {
		Self { policies }
	}
}

#[async_trait]
impl PolicyProvider for LocalPolicyProvider {
	async fn get_weights(&self, classifier: &str) -> Result<Vec<Weight>, PolicyError> {
		self.policies
			.iter()
			.find(|p| p.name == classifier)
			.map(|p| p.weights.clone())
			.ok_or_else(|| PolicyError::UnknownClassifier(classifier.to_string()))
	}
}

/// Provider backed by an open-policy weights service.
pub struct OpenPolicyProvider {
	cfg: OpenPolicyConfig,
	client: reqwest::Client,
}

impl OpenPolicyProvider {
	pub fn new(cfg: OpenPolicyConfig) -> Self {
		Self {
			cfg,
			client: reqwest::Client::new(),
		}
	}
}

#[derive(Serialize)]
struct OpaWeightsRequest<'a> {
	classifier: &'a str,
}

/// Response shape of the weights query: the first element of `result` maps
/// annotation kind to weight.
#[derive(Deserialize)]
struct OpaWeightsResponse {
	#[serde(default)]
	result: Vec<BTreeMap<String, i64>>,
}

#[async_trait]
impl PolicyProvider for OpenPolicyProvider {
	async fn get_weights(&self, classifier: &str) -> Result<Vec<Weight>, PolicyError> {
		let url = format!("{}{}", self.cfg.provider.uri(), self.cfg.weights.path);
		tracing::debug!(%url, classifier, "fetching policy weights");

		let response = self
			.client
			.post(&url)
			.json(&OpaWeightsRequest { classifier })
			.send()
			.await?
			.error_for_status()?;

		let decoded: OpaWeightsResponse = response.json().await?;
		let first = decoded.result.into_iter().next().ok_or(PolicyError::EmptyResponse)?;

		Ok(first
			.into_iter()
			.map(|(annotation_key, value)| Weight {
				annotation_key,
				value: value.clamp(1, 10) as u32,
			})
			.collect())
	}
}
