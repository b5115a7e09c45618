//! Extension methods for [`Block`] implemented outside `block.rs` to keep
//! the core data-structure definition terse.
//!
//! * [`Block::mine`] – single-threaded brute-force mining loop. No
//!   cooperative suspension point inside the loop; a caller wanting to
//!   cancel a long-running mine interrupts at the thread boundary (see
//!   [`crate::chain::Chain::mine_pending`]'s unlocked mining worker).
//! * [`Block::is_valid`] – contextual validation against PoW target, hash
//!   recomputation, and chain linkage.

use crate::{pow, Block};

impl Block {
    /// Increments `nonce` until the block hash satisfies its configured
    /// difficulty, recomputing the hash after each increment.
    pub fn mine(&mut self) {
        self.hash = self.recompute_hash();
        while !pow::hash_meets_difficulty(&self.hash, self.difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.recompute_hash();
        }
    }

    /// Returns `true` if the block's stored hash matches recomputation,
    /// the difficulty target is met, and `expected_prev` matches
    /// `previous_hash` (typically the chain tip hash at the time this
    /// block was appended).
    pub fn is_valid(&self, expected_prev: &str) -> bool {
        self.previous_hash == expected_prev
            && self.hash == self.recompute_hash()
            && pow::hash_meets_difficulty(&self.hash, self.difficulty)
    }
}
