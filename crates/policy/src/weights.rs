//! Weight policy model.

use serde::{Deserialize, Serialize};

/// A named vector of per-annotation-kind weights.
///
/// The name doubles as the classifier under which the policy is registered
/// with a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightPolicy {
	#[serde(rename = "classifier", default)]
	pub name: String,
	#[serde(rename = "items", default)]
	pub weights: Vec<Weight>,
}

impl WeightPolicy {
	/// Weight for an annotation kind.
	///
	/// Unknown kinds get the default weight of 1; this is deliberately not an
	/// error so that new annotator kinds degrade gracefully.
	pub fn fetch_weight(&self, kind: &str) -> u32 {
		self.weights
			.iter()
			.find(|w| w.annotation_key == kind)
			.map(|w| w.value.clamp(1, 10))
			.unwrap_or(1)
	}
}

/// Relative importance of one annotation kind, from 1 to 10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Weight {
	#[serde(rename = "key")]
	pub annotation_key: String,
	#[serde(rename = "value")]
	pub value: u32,
}

// Out-of-range values are clamped at the edge rather than rejected, so a
// policy document with an over-eager weight still loads.
impl<'de> Deserialize<'de> for Weight {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		struct Raw {
			#[serde(rename = "key", default)]
			annotation_key: String,
			#[serde(rename = "value", default)]
			value: i64,
		}

		let raw = Raw::deserialize(deserializer)?;
		Ok(Weight {
			annotation_key: raw.annotation_key,
			value: raw.value.clamp(1, 10) as u32,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn weight_roundtrip() {
		let w = Weight {
			annotation_key: "tpm".to_string(),
			value: 5,
		};
		let decoded: Weight = serde_json::from_str(&serde_json::to_string(&w).unwrap()).unwrap();
		assert_eq!(decoded, w);
	}

	#[test]
	fn weight_value_empty_defaults_to_min() {
		let decoded: Weight = serde_json::from_str(r#"{"key": "min"}"#).unwrap();
		assert_eq!(decoded.value, 1);
	}

	#[test]
	fn weight_value_too_high_is_clamped() {
		let decoded: Weight = serde_json::from_str(r#"{"key": "max", "value": 100}"#).unwrap();
		assert_eq!(decoded.value, 10);
	}

	#[test]
	fn unknown_kind_gets_default_weight() {
		let policy = WeightPolicy {
			name: "default".to_string(),
			weights: vec![Weight {
				annotation_key: "tpm".to_string(),
				value: 5,
			}],
		};
		assert_eq!(policy.fetch_weight("tpm"), 5);
		assert_eq!(policy.fetch_weight("tls"), 1);
	}
}
