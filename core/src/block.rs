//! Blocks: ordered, hash-linked batches of transactions.
//!
//! A block's hash covers its index, timestamp, previous-block hash, nonce,
//! and the concatenation of its transactions' fingerprints. Mining (see
//! [`crate::block_ext`]) and validation both recompute this hash; they must
//! never diverge from [`Block::recompute_hash`], which is why that function
//! is the single source of truth used by both.

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An ordered batch of transactions, linked to its predecessor by hash and
/// sealed by a proof-of-work nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,
    pub difficulty: usize,
    pub hash: String,
}

impl Block {
    /// Constructs a block with `nonce = 0` and an initial (almost certainly
    /// invalid) hash. Callers mine it via [`crate::block_ext`]'s `mine`
    /// before appending it to a chain.
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: String, difficulty: usize) -> Self {
        let timestamp = now_ts();
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            difficulty,
            hash: String::new(),
        };
        block.hash = block.recompute_hash();
        block
    }

    /// Pure recomputation of the block hash from its current fields. Used
    /// both by the mining loop (after each nonce increment) and by
    /// validators (to detect tampering).
    pub fn recompute_hash(&self) -> String {
        let tx_fingerprints: String = self.transactions.iter().map(Transaction::fingerprint).collect();
        let payload = format!(
            "{}{}{}{}{}",
            self.index, self.timestamp, self.previous_hash, self.nonce, tx_fingerprints
        );
        hex::encode(Sha256::digest(payload.as_bytes()))
    }

    /// The genesis block's sole transaction must satisfy this shape —
    /// sender `"0"`, receiver `"system"`, amount zero, kind `genesis`.
    pub fn is_genesis_shaped(&self) -> bool {
        self.index == 0
            && self.previous_hash == "0"
            && self.transactions.len() == 1
            && self.transactions[0].kind == crate::transaction::TxKind::Genesis
    }
}

fn now_ts() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Credits;
    use crate::transaction::TxKind;

    fn tx() -> Transaction {
        Transaction::bare("0", "alice", Credits::from_whole(10), TxKind::InitialCredit)
    }

    #[test]
    fn hash_matches_recomputation_on_construction() {
        let block = Block::new(1, vec![tx()], "prev".into(), 0);
        assert_eq!(block.hash, block.recompute_hash());
    }

    #[test]
    fn changing_nonce_changes_hash() {
        let mut block = Block::new(1, vec![tx()], "prev".into(), 0);
        let original = block.hash.clone();
        block.nonce += 1;
        assert_ne!(original, block.recompute_hash());
    }

    #[test]
    fn genesis_shape_requires_index_prev_and_sole_genesis_tx() {
        let genesis_tx = Transaction::bare("0", "system", Credits::ZERO, TxKind::Genesis);
        let genesis = Block::new(0, vec![genesis_tx], "0".into(), 0);
        assert!(genesis.is_genesis_shaped());

        let non_genesis = Block::new(1, vec![tx()], "prev".into(), 0);
        assert!(!non_genesis.is_genesis_shaped());
    }
}
