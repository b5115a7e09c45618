//! `System`: the facade translating user intents into ledger operations.
//!
//! `System` owns the single [`Chain`], the mapping from user handle to
//! ledger identity, one [`Registry`] per user plus a community registry,
//! and the composite operations (`register_user`, `publish`, `download`,
//! `mine`) that stitch chain admissions and registry mutations together.
//!
//! Per the design notes, `System` is constructed explicitly rather than
//! reached for as a process-wide singleton, so tests can spin up isolated
//! instances freely.

use crate::amount::Credits;
use crate::chain::{resource_payload_from, Chain, ChainInfo};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::{self, SYSTEM_SENDER};
use crate::registry::{NewResource, Registry, ResourcePatch, SearchQuery, SharedFile};
use crate::transaction::{Transaction, TxKind};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

struct UserEntry {
    identity: String,
    registry: Registry,
}

/// The resource-exchange system: one chain, many users, one registry per
/// user plus a shared community registry.
pub struct System {
    chain: Chain,
    users: RwLock<HashMap<String, UserEntry>>,
    community: Registry,
    config: Config,
}

impl System {
    pub fn new(config: Config) -> Self {
        info!(difficulty = config.difficulty, base_reward = config.base_reward, "system initialized");
        Self {
            chain: Chain::new(config.clone()),
            users: RwLock::new(HashMap::new()),
            community: Registry::with_demo_resources(),
            config,
        }
    }

    /// Registers a new user: mints a stable identity, creates an empty
    /// registry for them, and enqueues their initial-credit transaction
    /// (spendable only after the next successful mine). Fails loudly if
    /// `handle` is already registered.
    pub fn register_user(&self, handle: &str) -> Result<String> {
        {
            let users = self.users.read().unwrap_or_else(|e| e.into_inner());
            if users.contains_key(handle) {
                return Err(Error::UserExists(handle.to_string()));
            }
        }
        let new_identity = identity::derive(handle);

        // Claim the handle under the write lock first: a concurrent
        // registration of the same handle could have raced us between the
        // read check above and taking the write lock. Only once the claim
        // succeeds do we enqueue the endowment, so a losing registration
        // never leaves a stray system-sent transaction in the pool.
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        if users.contains_key(handle) {
            return Err(Error::UserExists(handle.to_string()));
        }
        users.insert(handle.to_string(), UserEntry { identity: new_identity.clone(), registry: Registry::new() });
        drop(users);

        let endowment = Transaction::bare(SYSTEM_SENDER, &new_identity, Credits::from_whole(self.config.initial_credit), TxKind::InitialCredit);
        self.chain.add_transaction(endowment);

        info!(handle, identity = %new_identity, "user registered");
        Ok(new_identity)
    }

    /// The identity bound to `handle`, if registered.
    pub fn get_user(&self, handle: &str) -> Option<String> {
        self.users.read().unwrap_or_else(|e| e.into_inner()).get(handle).map(|u| u.identity.clone())
    }

    /// Publishes a resource on `handle`'s own registry and enqueues the
    /// resource-declaration credit transaction. Rolls back the registry
    /// insertion if the transaction cannot be enqueued (which in practice
    /// only happens if the system identity itself has gone missing from
    /// the chain's bookkeeping, since system-sent transactions are always
    /// admitted).
    pub fn publish(&self, handle: &str, fields: NewResource) -> bool {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let Some(user) = users.get(handle) else { return false };
        let file = user.registry.add(fields, &user.identity);
        let credit = self.config.declaration_credit(file.size_gb);
        let tx = Transaction::new(SYSTEM_SENDER, &user.identity, credit, TxKind::ResourceDeclaration, resource_payload_from(&file));
        let admitted = self.chain.add_transaction(tx);
        if !admitted {
            user.registry.remove(file.id, &user.identity);
        }
        admitted
    }

    /// Downloads `resource_id` from `owner_handle`'s registry on behalf of
    /// `downloader_handle`. Self-downloads are refused. On success,
    /// increments the resource's seed count (the downloader becomes a new
    /// seed).
    pub fn download(&self, downloader_handle: &str, owner_handle: &str, resource_id: u64) -> bool {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let (Some(downloader), Some(owner)) = (users.get(downloader_handle), users.get(owner_handle)) else {
            return false;
        };
        if downloader.identity == owner.identity {
            return false;
        }
        let Some(file) = owner.registry.get(resource_id) else { return false };
        if !file.is_active {
            return false;
        }
        let cost = self.config.download_cost(file.size_gb);
        let fee = self.config.fee(cost);
        if self.chain.balance(&downloader.identity) < cost + fee {
            return false;
        }
        let tx = Transaction::new(&downloader.identity, &owner.identity, cost, TxKind::ResourceDownload, resource_payload_from(&file));
        let admitted = self.chain.add_transaction(tx);
        if admitted {
            owner.registry.adjust_counts(resource_id, 1, 0);
        }
        admitted
    }

    /// Mines the pending pool on behalf of `handle`, crediting them as the
    /// miner. Returns the mined block, if any.
    pub fn mine(&self, handle: &str) -> Option<crate::block::Block> {
        let identity = self.get_user(handle)?;
        self.chain.mine_pending(&identity)
    }

    /// `handle`'s confirmed balance, or zero if unregistered.
    pub fn balance(&self, handle: &str) -> Credits {
        match self.get_user(handle) {
            Some(identity) => self.chain.balance(&identity),
            None => Credits::ZERO,
        }
    }

    pub fn blockchain_info(&self) -> ChainInfo {
        self.chain.info()
    }

    /// Every confirmed block, oldest first, in the dictionary form spec.md
    /// §6 defines for external serialization.
    pub fn blocks(&self) -> Vec<crate::block::Block> {
        self.chain.blocks()
    }

    /// Searches every user's registry plus the community registry,
    /// returning active matches.
    pub fn search_resources(&self, query: &SearchQuery) -> Vec<SharedFile> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let mut results: Vec<SharedFile> = users.values().flat_map(|u| u.registry.search(query)).collect();
        results.extend(self.community.search(query));
        results
    }

    /// Every active resource across all registries plus the community
    /// registry.
    pub fn all_resources(&self) -> Vec<SharedFile> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let mut results: Vec<SharedFile> = users.values().flat_map(|u| u.registry.active()).collect();
        results.extend(self.community.active());
        results
    }

    /// Every resource across all registries plus the community registry,
    /// grouped by category tag (active and inactive alike).
    pub fn resources_by_category(&self) -> std::collections::BTreeMap<String, Vec<SharedFile>> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let mut groups = self.community.by_category();
        for user in users.values() {
            for (category, files) in user.registry.by_category() {
                groups.entry(category).or_default().extend(files);
            }
        }
        groups
    }

    /// Removes `handle`'s own resource. Delegates ownership enforcement to
    /// the registry.
    pub fn remove_resource(&self, handle: &str, resource_id: u64) -> bool {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let Some(user) = users.get(handle) else { return false };
        user.registry.remove(resource_id, &user.identity)
    }

    /// Patches `handle`'s own resource (including activation toggling).
    pub fn update_resource(&self, handle: &str, resource_id: u64, patch: ResourcePatch) -> Option<SharedFile> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        let user = users.get(handle)?;
        user.registry.update(resource_id, patch, &user.identity)
    }

    /// `handle`'s own resources.
    pub fn my_resources(&self, handle: &str) -> Vec<SharedFile> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        match users.get(handle) {
            Some(user) => user.registry.by_owner(&user.identity),
            None => Vec::new(),
        }
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NewResource;

    fn resource(name: &str, size_gb: f64) -> NewResource {
        NewResource {
            name: name.into(),
            size_gb,
            uploader: name.into(),
            seeds: 0,
            peers: 0,
            description: "desc".into(),
            category: "document".into(),
            file_hash: String::new(),
            storage_path: String::new(),
        }
    }

    fn system() -> System {
        System::new(Config { difficulty: 0, ..Config::default() })
    }

    #[test]
    fn duplicate_registration_fails_loudly() {
        let sys = system();
        sys.register_user("alice").unwrap();
        assert!(matches!(sys.register_user("alice"), Err(Error::UserExists(_))));
    }

    #[test]
    fn scenario_s1_endowment_then_mine() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.mine("alice").unwrap();
        assert_eq!(sys.blockchain_info().chain_length, 2);
        assert_eq!(sys.balance("alice"), Credits::from_whole(10_000) + Credits::from_whole(50));
    }

    #[test]
    fn scenario_s2_publish_reward() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.mine("alice").unwrap();
        assert!(sys.publish("alice", resource("Guide.pdf", 0.025)));
        sys.mine("alice").unwrap();
        assert_eq!(sys.balance("alice"), Credits::from_whole(10_125));
    }

    #[test]
    fn scenario_s3_download_payment() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.mine("alice").unwrap();
        sys.publish("alice", resource("Guide.pdf", 0.025));
        sys.mine("alice").unwrap();

        sys.register_user("bob").unwrap();
        sys.mine("bob").unwrap();

        // seed Carol's endowment onto the chain *before* the download is
        // enqueued, so the download rides in the block Carol mines.
        sys.register_user("carol").unwrap();
        sys.mine("alice").unwrap();

        let alice_resource = sys.my_resources("alice")[0].id;
        assert!(sys.download("bob", "alice", alice_resource));
        let block = sys.mine("carol").unwrap();

        assert_eq!(sys.balance("bob"), Credits::from_whole(10_050) - Credits::from_whole(25));
        assert_eq!(sys.balance("alice"), Credits::from_whole(10_125) + Credits::from_whole(25));
        let reward = block.transactions.last().unwrap();
        assert_eq!(reward.amount, Credits::from_whole(50) + Credits::from_whole(25).scaled(0.001));
    }

    #[test]
    fn scenario_s4_insufficient_funds_refused() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.mine("alice").unwrap();
        sys.publish("alice", resource("Guide.pdf", 0.025));
        sys.mine("alice").unwrap();
        sys.register_user("dan").unwrap();

        let resource_id = sys.my_resources("alice")[0].id;
        let before_chain_length = sys.blockchain_info().chain_length;
        let before_pending = sys.blockchain_info().pending_transactions;
        assert!(!sys.download("dan", "alice", resource_id));
        assert_eq!(sys.blockchain_info().pending_transactions, before_pending);
        assert_eq!(sys.blockchain_info().chain_length, before_chain_length);
    }

    #[test]
    fn scenario_s5_ownership_enforced() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.register_user("bob").unwrap();
        sys.mine("alice").unwrap();
        sys.mine("bob").unwrap();
        sys.publish("bob", resource("BobFile.zip", 0.01));
        let bob_resource = sys.my_resources("bob")[0].id;
        assert!(!sys.remove_resource("alice", bob_resource));
        assert_eq!(sys.my_resources("bob").len(), 1);
    }

    #[test]
    fn download_of_own_resource_is_refused() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.mine("alice").unwrap();
        sys.publish("alice", resource("Guide.pdf", 0.025));
        sys.mine("alice").unwrap();
        let resource_id = sys.my_resources("alice")[0].id;
        assert!(!sys.download("alice", "alice", resource_id));
    }

    #[test]
    fn unknown_handles_return_false_or_none() {
        let sys = system();
        assert!(!sys.publish("ghost", resource("x", 0.1)));
        assert!(!sys.download("ghost", "also-ghost", 1));
        assert!(sys.mine("ghost").is_none());
        assert_eq!(sys.balance("ghost"), Credits::ZERO);
    }

    #[test]
    fn resources_by_category_merges_community_and_user_registries() {
        let sys = system();
        sys.register_user("alice").unwrap();
        sys.mine("alice").unwrap();
        sys.publish("alice", resource("Guide.pdf", 0.025));

        let groups = sys.resources_by_category();
        // community registry seeds one resource each under "document",
        // "audio", and "software"
        assert_eq!(groups.get("document").map(Vec::len), Some(2));
        assert_eq!(groups.get("audio").map(Vec::len), Some(1));
    }

    #[test]
    fn registration_race_leaves_no_stray_endowment_on_losing_handle() {
        let sys = system();
        sys.register_user("alice").unwrap();
        assert!(matches!(sys.register_user("alice"), Err(Error::UserExists(_))));
        // the losing call must not have enqueued a second InitialCredit
        // transaction for a fresh identity derived before the duplicate
        // check; only alice's own endowment should be pending.
        assert_eq!(sys.blockchain_info().pending_transactions, 1);
        sys.mine("alice").unwrap();
        assert_eq!(sys.balance("alice"), Credits::from_whole(10_000) + Credits::from_whole(50));
    }
}
