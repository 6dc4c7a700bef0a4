//! The `SecureMessage` wire format and canonical JSON signing bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version carried on every message.
pub const PROTOCOL_VERSION: &str = "1.1";

/// A signed, optionally session-bound message exchanged between agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureMessage {
    pub version: String,
    pub msg_type: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    /// Base64-encoded 16-byte random nonce.
    pub nonce: String,
    /// Base64-encoded Ed25519 signature. Empty until [`SecureMessage::sign`].
    #[serde(default)]
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_num: Option<u64>,
}

impl SecureMessage {
    pub fn new(
        msg_type: impl Into<String>,
        sender_id: impl Into<String>,
        recipient_id: Option<String>,
        payload: Value,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            msg_type: msg_type.into(),
            sender_id: sender_id.into(),
            recipient_id,
            payload,
            timestamp: Utc::now(),
            nonce: random_nonce_b64(),
            signature: String::new(),
            session_id: None,
            sequence_num: None,
        }
    }

    /// Canonical signable bytes: same object with `signature` omitted, keys
    /// sorted lexicographically, no insignificant whitespace, UTF-8.
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(ref mut map) = value {
            map.remove("signature");
        }
        canonicalize(&value)
    }
}

/// Recursively sorts object keys and re-serializes with no insignificant
/// whitespace, so the same logical message always canonicalizes to the
/// same bytes regardless of input key order.
pub fn canonicalize(value: &Value) -> serde_json::Result<Vec<u8>> {
    let sorted = sort_keys(value);
    serde_json::to_vec(&sorted)
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn random_nonce_b64() -> String {
    use base64::Engine;
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_bytes_are_key_sorted() {
        let msg = SecureMessage::new("ping", "alpha", None, json!({"b": 1, "a": 2}));
        let bytes = msg.canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        // payload keys must appear sorted within the payload object, and the
        // top-level object key order must be deterministic regardless of
        // struct field declaration order.
        assert!(text.contains("\"payload\":{\"a\":2,\"b\":1}"));
        assert!(!text.contains(' '));
        assert!(!text.contains("signature"));
    }

    #[test]
    fn roundtrip_preserves_equality() {
        let msg = SecureMessage::new("ping", "alpha", Some("beta".into()), json!({"seq": 1}));
        let encoded = serde_json::to_vec(&msg).unwrap();
        let decoded: SecureMessage = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(msg.sender_id, decoded.sender_id);
        assert_eq!(msg.payload, decoded.payload);
        assert_eq!(msg.nonce, decoded.nonce);
    }
}
