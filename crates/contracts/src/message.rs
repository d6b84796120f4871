//! Transport envelopes.
//!
//! Payload bytes travel base64-encoded inside JSON, matching what the
//! annotator SDK publishes.

use serde::{Deserialize, Serialize};

/// Message type announcing that a data key is ready for scoring.
pub const MSG_CALCULATE_SCORE: &str = "CalculateScore";

/// Action carried by an inbound annotation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageAction {
	Create,
	Transit,
	Mutate,
	Other(String),
}

impl MessageAction {
	pub fn as_str(&self) -> &str {
		match self {
			MessageAction::Create => "create",
			MessageAction::Transit => "transit",
			MessageAction::Mutate => "mutate",
			MessageAction::Other(s) => s,
		}
	}
}

impl From<String> for MessageAction {
	fn from(value: String) -> Self {
		match value.as_str() {
			"create" => MessageAction::Create,
			"transit" => MessageAction::Transit,
			"mutate" => MessageAction::Mutate,
			_ => MessageAction::Other(value),
		}
	}
}

impl From<MessageAction> for String {
	fn from(value: MessageAction) -> Self {
		value.as_str().to_string()
	}
}

impl std::fmt::Display for MessageAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Default for MessageAction {
	fn default() -> Self {
		MessageAction::Other(String::new())
	}
}

/// Envelope received from the annotation stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeWrapper {
	#[serde(default)]
	pub message_type: String,
	#[serde(default)]
	pub action: MessageAction,
	#[serde(with = "base64_bytes", default)]
	pub content: Vec<u8>,
}

/// Envelope published to downstream deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishWrapper {
	pub message_type: String,
	#[serde(with = "base64_bytes")]
	pub content: Vec<u8>,
}

impl PublishWrapper {
	/// Envelope asking a calculator deployment to score `key`.
	pub fn calculate_score(key: &str) -> Self {
		Self {
			message_type: MSG_CALCULATE_SCORE.to_string(),
			content: key.as_bytes().to_vec(),
		}
	}
}

/// Serde adapter encoding byte payloads as standard base64 strings.
mod base64_bytes {
	use base64::Engine;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let text = String::deserialize(deserializer)?;
		STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wrapper_content_roundtrips_as_base64() {
		let wrapper = PublishWrapper::calculate_score("abc123");
		let encoded = serde_json::to_value(&wrapper).unwrap();
		assert_eq!(encoded["messageType"], MSG_CALCULATE_SCORE);
		assert_eq!(encoded["content"], "YWJjMTIz");

		let decoded: PublishWrapper = serde_json::from_value(encoded).unwrap();
		assert_eq!(decoded.content, b"abc123");
	}

	#[test]
	fn unknown_action_is_preserved() {
		let wrapper: SubscribeWrapper =
			serde_json::from_str(r#"{"messageType":"x","action":"drop","content":""}"#).unwrap();
		assert_eq!(wrapper.action, MessageAction::Other("drop".to_string()));
	}
}
