//! The process-wide append-only chain: pending pool, block assembly,
//! proof-of-work mining, chain validation, and balance replay.
//!
//! `Chain` holds no back-reference to its users — per the design notes,
//! user handles map to identities held by [`crate::system::System`], and
//! identities are plain strings inside transactions. This avoids the
//! User ↔ Chain cycle present in the system this crate's economics are
//! grounded on.

use crate::amount::Credits;
use crate::block::Block;
use crate::config::Config;
use crate::identity::SYSTEM_SENDER;
use crate::transaction::{ResourcePayload, Transaction, TxKind};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

struct ChainState {
    blocks: Vec<Block>,
    pending: VecDeque<Transaction>,
}

impl ChainState {
    fn tip(&self) -> &Block {
        self.blocks.last().expect("chain always has at least the genesis block")
    }
}

/// A snapshot of chain metadata, matching the ledger API's
/// `get_blockchain_info` contract.
#[derive(Debug, Clone, Serialize)]
pub struct ChainInfo {
    pub chain_length: u64,
    pub pending_transactions: u64,
    pub current_difficulty: usize,
    pub current_mining_reward: Credits,
    pub is_valid: bool,
}

/// The append-only sequence of blocks plus the pending-transaction pool.
pub struct Chain {
    state: Mutex<ChainState>,
    config: Config,
}

impl Chain {
    /// Builds a chain with a freshly mined genesis block: index 0, sole
    /// transaction of kind `genesis` (sender `"0"`, receiver `"system"`,
    /// amount 0), previous hash `"0"`.
    pub fn new(config: Config) -> Self {
        let genesis_tx = Transaction::bare(SYSTEM_SENDER, crate::identity::SYSTEM_RECEIVER, Credits::ZERO, TxKind::Genesis);
        let mut genesis = Block::new(0, vec![genesis_tx], "0".to_string(), config.difficulty);
        genesis.mine();
        info!(hash = %genesis.hash, "genesis block mined");
        Self { state: Mutex::new(ChainState { blocks: vec![genesis], pending: VecDeque::new() }), config }
    }

    /// Admits `tx` to the pending pool. Transactions sent by the system
    /// identity (`"0"`) are admitted unconditionally; all others are
    /// admitted only if the sender's confirmed balance covers the amount.
    pub fn add_transaction(&self, tx: Transaction) -> bool {
        let mut state = self.lock();
        if tx.is_system_sent() {
            debug!(sender = %tx.sender, receiver = %tx.receiver, amount = %tx.amount, kind = ?tx.kind, "admitted system transaction");
            state.pending.push_back(tx);
            return true;
        }
        let sender_balance = balance_over(&state.blocks, &tx.sender);
        if sender_balance >= tx.amount {
            debug!(sender = %tx.sender, receiver = %tx.receiver, amount = %tx.amount, kind = ?tx.kind, "admitted transaction");
            state.pending.push_back(tx);
            true
        } else {
            warn!(sender = %tx.sender, balance = %sender_balance, amount = %tx.amount, "rejected transaction: insufficient balance");
            false
        }
    }

    /// Mines a block containing every transaction currently pending plus a
    /// trailing mining-reward transaction. Returns `None` if the pool was
    /// empty. Holds the chain lock only for the snapshot and commit phases;
    /// the proof-of-work loop itself runs unlocked (see module docs), so a
    /// competing `mine_pending` call (or more transactions arriving) cannot
    /// stall behind it.
    pub fn mine_pending(&self, miner_identity: &str) -> Option<Block> {
        let snapshot = {
            let mut state = self.lock();
            if state.pending.is_empty() {
                return None;
            }
            state.pending.drain(..).collect::<Vec<_>>()
        };

        let fee_total: Credits = snapshot
            .iter()
            .filter(|tx| tx.kind.is_fee_bearing())
            .map(|tx| self.config.fee(tx.amount))
            .sum();

        loop {
            let (tip_hash, index) = {
                let state = self.lock();
                (state.tip().hash.clone(), state.blocks.len() as u64)
            };

            let reward_amount = self.current_reward_for_length(index) + fee_total;
            let reward_tx = Transaction::bare(SYSTEM_SENDER, miner_identity, reward_amount, TxKind::MiningReward);

            let mut transactions = snapshot.clone();
            transactions.push(reward_tx);

            let mut block = Block::new(index, transactions, tip_hash.clone(), self.config.difficulty);
            let started = Instant::now();
            block.mine();
            let elapsed = started.elapsed();

            let mut state = self.lock();
            if state.tip().hash == tip_hash {
                info!(index = block.index, hash = %block.hash, elapsed_ms = elapsed.as_millis(), "block mined");
                state.blocks.push(block.clone());
                return Some(block);
            }
            drop(state);
            warn!(index, "tip advanced during mining, retrying with new tip");
        }
    }

    /// Replays the entire confirmed chain to compute `identity`'s balance.
    /// The pending pool does not contribute.
    pub fn balance(&self, identity: &str) -> Credits {
        let state = self.lock();
        balance_over(&state.blocks, identity)
    }

    /// `base_reward / 2^(chain_length // halving_interval)`, evaluated at
    /// the chain's current length.
    pub fn current_reward(&self) -> Credits {
        let state = self.lock();
        self.current_reward_for_length(state.blocks.len() as u64)
    }

    fn current_reward_for_length(&self, chain_length: u64) -> Credits {
        let halvings = (chain_length / self.config.halving_interval).min(62) as u32;
        Credits::from_f64(self.config.base_reward as f64 / 2f64.powi(halvings as i32))
    }

    /// The genesis block must have the expected shape, every block after it
    /// must have a stored hash that matches recomputation, `previous_hash`
    /// must match the prior block's hash, and the difficulty target must be
    /// met.
    pub fn is_valid(&self) -> bool {
        let state = self.lock();
        chain_is_valid(&state.blocks)
    }

    pub fn chain_length(&self) -> u64 {
        self.lock().blocks.len() as u64
    }

    pub fn pending_len(&self) -> u64 {
        self.lock().pending.len() as u64
    }

    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a clone of every confirmed block, oldest first.
    pub fn blocks(&self) -> Vec<Block> {
        self.lock().blocks.clone()
    }

    pub fn info(&self) -> ChainInfo {
        let state = self.lock();
        ChainInfo {
            chain_length: state.blocks.len() as u64,
            pending_transactions: state.pending.len() as u64,
            current_difficulty: self.config.difficulty,
            current_mining_reward: self.current_reward_for_length(state.blocks.len() as u64),
            is_valid: chain_is_valid(&state.blocks),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn chain_is_valid(blocks: &[Block]) -> bool {
    blocks.first().map_or(false, Block::is_genesis_shaped)
        && blocks.windows(2).all(|pair| pair[1].is_valid(&pair[0].hash))
}

fn balance_over(blocks: &[Block], identity: &str) -> Credits {
    let mut total = Credits::ZERO;
    for block in blocks {
        for tx in &block.transactions {
            if tx.receiver == identity {
                total = total + tx.amount;
            }
            if tx.sender == identity && !tx.is_system_sent() {
                total = total - tx.amount;
            }
        }
    }
    total
}

/// Convenience constructor for a bare resource-declaration/download
/// transaction carrying a resource payload, used by
/// [`crate::system::System`].
pub fn resource_payload_from(file: &crate::registry::SharedFile) -> ResourcePayload {
    let value = serde_json::to_value(file).expect("SharedFile serializes");
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => ResourcePayload::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Chain {
        Chain::new(Config { difficulty: 0, ..Config::default() })
    }

    #[test]
    fn genesis_is_pre_mined_and_valid() {
        let chain = chain();
        assert_eq!(chain.chain_length(), 1);
        assert!(chain.is_valid());
    }

    #[test]
    fn system_transactions_are_admitted_unconditionally() {
        let chain = chain();
        let tx = Transaction::bare(SYSTEM_SENDER, "alice", Credits::from_whole(10_000), TxKind::InitialCredit);
        assert!(chain.add_transaction(tx));
        assert_eq!(chain.pending_len(), 1);
    }

    #[test]
    fn non_system_transaction_without_balance_is_rejected() {
        let chain = chain();
        let tx = Transaction::bare("alice", "bob", Credits::from_whole(5), TxKind::Transfer);
        assert!(!chain.add_transaction(tx));
        assert_eq!(chain.pending_len(), 0);
        assert_eq!(chain.chain_length(), 1);
    }

    #[test]
    fn mine_pending_on_empty_pool_returns_none() {
        let chain = chain();
        assert!(chain.mine_pending("alice").is_none());
        assert_eq!(chain.chain_length(), 1);
    }

    #[test]
    fn mining_appends_reward_as_last_transaction() {
        let chain = chain();
        chain.add_transaction(Transaction::bare(SYSTEM_SENDER, "alice", Credits::from_whole(10_000), TxKind::InitialCredit));
        let block = chain.mine_pending("alice").unwrap();
        assert_eq!(block.transactions.last().unwrap().kind, TxKind::MiningReward);
        assert_eq!(chain.chain_length(), 2);
        assert_eq!(chain.balance("alice"), Credits::from_whole(10_000) + Credits::from_whole(50));
    }

    #[test]
    fn current_reward_halves_at_interval() {
        let chain = Chain::new(Config { difficulty: 0, halving_interval: 2, base_reward: 50, ..Config::default() });
        chain.add_transaction(Transaction::bare(SYSTEM_SENDER, "alice", Credits::from_whole(1), TxKind::InitialCredit));
        chain.mine_pending("alice").unwrap(); // chain_length becomes 2 -> halvings = 2/2 = 1
        assert_eq!(chain.current_reward(), Credits::from_f64(25.0));
    }

    #[test]
    fn tampering_with_non_tip_block_invalidates_chain() {
        let chain = chain();
        chain.add_transaction(Transaction::bare(SYSTEM_SENDER, "alice", Credits::from_whole(10_000), TxKind::InitialCredit));
        chain.mine_pending("alice").unwrap();
        chain.add_transaction(Transaction::bare(SYSTEM_SENDER, "alice", Credits::from_whole(1), TxKind::InitialCredit));
        chain.mine_pending("alice").unwrap();
        assert!(chain.is_valid());
        {
            let mut state = chain.lock();
            state.blocks[1].nonce = state.blocks[1].nonce.wrapping_add(1);
        }
        assert!(!chain.is_valid());
    }

    #[test]
    fn fee_is_credited_to_miner_not_double_debited() {
        let chain = chain();
        chain.add_transaction(Transaction::bare(SYSTEM_SENDER, "alice", Credits::from_whole(10_000), TxKind::InitialCredit));
        chain.mine_pending("alice").unwrap();
        let cost = Credits::from_whole(25);
        chain.add_transaction(Transaction::bare("alice", "bob", cost, TxKind::ResourceDownload));
        let block = chain.mine_pending("carol").unwrap();
        // alice debited exactly `cost`, not cost+fee
        assert_eq!(chain.balance("alice"), Credits::from_whole(10_000) + Credits::from_whole(50) - cost);
        let reward_tx = block.transactions.last().unwrap();
        assert_eq!(reward_tx.amount, Credits::from_whole(50) + chain.config().fee(cost));
    }
}
