use crate::{constants::GENESIS_PREVIOUS_HASH, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub timestamp: f64,
    pub previous_hash: String,
    /// Set once by the proof-of-work search.
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Set once when the block is appended to a ledger.
    #[serde(default)]
    pub hash: Option<String>,
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: f64,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            transactions,
            timestamp,
            previous_hash: previous_hash.into(),
            nonce: None,
            hash: None,
        }
    }

    /// An empty, unsealed block at index 0 pointing at the all-zero sentinel.
    pub fn genesis(timestamp: f64) -> Self {
        Self::new(0, vec![], timestamp, GENESIS_PREVIOUS_HASH)
    }

    /// Hex SHA-256 of the canonical encoding of every field except `hash`.
    pub fn compute_hash(&self) -> String {
        sha256_hex(self.canonical_encoding(self.nonce).as_bytes())
    }

    /// Digest the block would have if its nonce were `nonce`. The block itself is untouched.
    pub fn hash_with_nonce(&self, nonce: u64) -> String {
        self.nonce_template().hash(nonce)
    }

    /// Encoding with everything but the nonce fixed, for hashing many nonces
    /// against the same block contents.
    pub fn nonce_template(&self) -> NonceTemplate {
        NonceTemplate {
            prefix: format!("{{\"index\":{},\"nonce\":", self.index),
            suffix: format!(",{}", self.encoded_tail()),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.nonce.is_some() && self.hash.is_some()
    }

    /// Compact JSON with keys sorted at every depth:
    /// `{"index":..,"nonce":..,"previous_hash":..,"timestamp":..,"transactions":[..]}`.
    /// `nonce` is left out entirely while unset.
    pub fn canonical_encoding(&self, nonce: Option<u64>) -> String {
        let tail = self.encoded_tail();
        match nonce {
            Some(nonce) => format!("{{\"index\":{},\"nonce\":{nonce},{tail}", self.index),
            None => format!("{{\"index\":{},{tail}", self.index),
        }
    }

    /// `"previous_hash":..,"timestamp":..,"transactions":[..]}`, i.e. the
    /// sorted object of the fields after `nonce` without its opening brace.
    fn encoded_tail(&self) -> String {
        let mut fields = Map::new();
        fields.insert(
            "previous_hash".to_string(),
            Value::from(self.previous_hash.as_str()),
        );
        fields.insert("timestamp".to_string(), Value::from(self.timestamp));
        fields.insert(
            "transactions".to_string(),
            Value::Array(self.transactions.iter().map(canonicalize).collect()),
        );
        Value::Object(fields).to_string().split_off(1)
    }
}

/// Pre-encoded block contents around the nonce position.
#[derive(Clone, Debug)]
pub struct NonceTemplate {
    prefix: String,
    suffix: String,
}

impl NonceTemplate {
    pub fn hash(&self, nonce: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.prefix.as_bytes());
        hasher.update(nonce.to_string().as_bytes());
        hasher.update(self.suffix.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index: {}", self.index)?;
        writeln!(f, " Transactions: {}", Value::from(self.transactions.clone()))?;
        writeln!(f, " Timestamp: {}", self.timestamp)?;
        writeln!(f, " PreviousHash: {}", self.previous_hash)
    }
}

/// Rebuild `value` with object keys in lexicographic order, whatever map
/// ordering serde_json was compiled with.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_block() -> Block {
        Block::new(
            1,
            vec![
                json!({"author": "alice", "content": "hello", "timestamp": 1_600_000_000.5}),
                json!("b"),
            ],
            1_600_000_200.25,
            "ab".repeat(32),
        )
    }

    #[test]
    fn canonical_encoding_sorts_keys() {
        let mut block = Block::new(
            3,
            vec![json!({"z": 1, "a": {"y": true, "b": null}})],
            10.5,
            "ff",
        );
        assert_eq!(
            block.canonical_encoding(block.nonce),
            r#"{"index":3,"previous_hash":"ff","timestamp":10.5,"transactions":[{"a":{"b":null,"y":true},"z":1}]}"#
        );
        block.nonce = Some(7);
        assert_eq!(
            block.canonical_encoding(block.nonce),
            r#"{"index":3,"nonce":7,"previous_hash":"ff","timestamp":10.5,"transactions":[{"a":{"b":null,"y":true},"z":1}]}"#
        );
    }

    #[test]
    fn compute_hash_is_sha256_of_encoding() {
        let block = sample_block();
        let expected = hex::encode(Sha256::digest(block.canonical_encoding(None).as_bytes()));
        assert_eq!(block.compute_hash(), expected);
        assert_eq!(block.compute_hash().len(), 64);
    }

    #[test]
    fn compute_hash_is_stable() {
        let block = sample_block();
        assert_eq!(block.compute_hash(), block.compute_hash());
        assert_eq!(block.clone().compute_hash(), block.compute_hash());
    }

    #[test]
    fn hash_ignores_stored_hash_field() {
        let mut block = sample_block();
        block.nonce = Some(5);
        let before = block.compute_hash();
        block.hash = Some("deadbeef".into());
        assert_eq!(block.compute_hash(), before);
    }

    #[test]
    fn hash_with_nonce_matches_compute_hash() {
        let mut block = sample_block();
        let scratch = block.hash_with_nonce(42);
        assert_eq!(block.nonce, None);
        block.nonce = Some(42);
        assert_eq!(block.compute_hash(), scratch);
    }

    #[test]
    fn hash_changes_with_each_field() {
        let base = {
            let mut b = sample_block();
            b.nonce = Some(1);
            b
        };
        let original = base.compute_hash();

        let mut b = base.clone();
        b.nonce = Some(2);
        assert_ne!(b.compute_hash(), original);

        let mut b = base.clone();
        b.index = 2;
        assert_ne!(b.compute_hash(), original);

        let mut b = base.clone();
        b.timestamp += 1.0;
        assert_ne!(b.compute_hash(), original);

        let mut b = base.clone();
        b.previous_hash = "cd".repeat(32);
        assert_ne!(b.compute_hash(), original);

        let mut b = base.clone();
        b.transactions[1] = json!("c");
        assert_ne!(b.compute_hash(), original);
    }

    #[test]
    fn nonce_template_matches_full_encoding() {
        let block = sample_block();
        let template = block.nonce_template();
        for nonce in [0, 1, 99, 1_000_000, u64::MAX] {
            let expected = sha256_hex(block.canonical_encoding(Some(nonce)).as_bytes());
            assert_eq!(template.hash(nonce), expected);
            assert_eq!(block.hash_with_nonce(nonce), expected);
        }
    }

    #[test]
    fn unset_nonce_differs_from_zero_nonce() {
        let block = sample_block();
        assert_ne!(block.compute_hash(), block.hash_with_nonce(0));
    }

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis(1_600_000_000.0);
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert!(!genesis.is_sealed());
    }

    #[test]
    fn display_lists_block_fields() {
        let block = Block::new(2, vec![json!("c"), json!("d")], 12.0, "00ab");
        let printed = block.to_string();
        assert!(printed.starts_with("Index: 2\n"));
        assert!(printed.contains(" Transactions: [\"c\",\"d\"]\n"));
        assert!(printed.contains(" Timestamp: 12\n"));
        assert!(printed.contains(" PreviousHash: 00ab\n"));
    }

    #[test]
    fn block_serialization_example() {
        let mut block = sample_block();
        block.nonce = Some(9);
        block.hash = Some(block.compute_hash());
        let json = serde_json::to_string(&block).unwrap();
        let deserialized: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, block);
        assert_eq!(deserialized.compute_hash(), block.hash.clone().unwrap());
    }
}
