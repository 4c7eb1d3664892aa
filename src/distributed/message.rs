// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plaintext message codec
//!
//! A message is the space-separated line `BOBO <urn> <id_key> <json>`
//! where the JSON document is a decider snapshot. The leading sentinel is
//! distinct from the binary end-of-frame sentinel; it marks a decrypted
//! payload as one of ours before the JSON is touched.

use crate::error::{CepFlowError, CepFlowResult};
use crate::run::DeciderSnapshot;

const MESSAGE_SENTINEL: &str = "BOBO";

/// Decrypted and parsed peer message
#[derive(Debug, Clone, PartialEq)]
pub struct PeerMessage {
    pub urn: String,
    pub id_key: String,
    pub snapshot: DeciderSnapshot,
}

impl PeerMessage {
    pub fn new(
        urn: impl Into<String>,
        id_key: impl Into<String>,
        snapshot: DeciderSnapshot,
    ) -> Self {
        Self {
            urn: urn.into(),
            id_key: id_key.into(),
            snapshot,
        }
    }

    /// Render the plaintext line
    pub fn encode(&self) -> CepFlowResult<String> {
        let json = serde_json::to_string(&self.snapshot)?;
        Ok(format!(
            "{MESSAGE_SENTINEL} {} {} {json}",
            self.urn, self.id_key
        ))
    }

    /// Parse a plaintext line
    pub fn decode(text: &str) -> CepFlowResult<Self> {
        let mut parts = text.splitn(4, ' ');
        let sentinel = parts.next().unwrap_or_default();
        if sentinel != MESSAGE_SENTINEL {
            return Err(CepFlowError::system("message missing sentinel prefix"));
        }
        let (Some(urn), Some(id_key), Some(json)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CepFlowError::system(
                "message must have four space-separated fields",
            ));
        };
        let snapshot: DeciderSnapshot = serde_json::from_str(json)?;
        Ok(Self::new(urn, id_key, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, History};
    use crate::run::RunTuple;
    use serde_json::json;

    fn snapshot() -> DeciderSnapshot {
        let mut history = History::new();
        history.push("a", Event::simple("e1", 1, json!(1)).unwrap());
        DeciderSnapshot {
            updated: vec![RunTuple {
                run_id: "r1".to_string(),
                process_name: "proc".to_string(),
                pattern_name: "pat".to_string(),
                block_index: 1,
                history,
            }],
            ..DeciderSnapshot::default()
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let message = PeerMessage::new("peer-1", "key123", snapshot());
        let text = message.encode().unwrap();
        assert!(text.starts_with("BOBO peer-1 key123 {"));
        assert_eq!(PeerMessage::decode(&text).unwrap(), message);
    }

    #[test]
    fn test_decode_rejects_bad_sentinel() {
        assert!(matches!(
            PeerMessage::decode("NOPE peer key {}"),
            Err(CepFlowError::System { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(matches!(
            PeerMessage::decode("BOBO peer"),
            Err(CepFlowError::System { .. })
        ));
    }

    #[test]
    fn test_json_spaces_survive_field_split() {
        let message = PeerMessage::new("peer-1", "key123", DeciderSnapshot::default());
        let mut text = message.encode().unwrap();
        // A pretty-printed payload contains spaces; only the first three
        // splits are field separators
        text = text.replace("{", "{ ");
        assert!(PeerMessage::decode(&text).is_ok());
    }
}
