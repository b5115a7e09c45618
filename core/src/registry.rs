//! Resource registry: owner-authorized storage for [`SharedFile`] descriptors.
//!
//! A `Registry` owns its own id counter and mapping from id to resource. The
//! [`crate::system::System`] facade holds one registry per user plus a
//! community registry seeded with demo resources (owner identity `""`).
//! Authorization (owner-only mutation) is enforced here; authentication
//! (proving the caller really is that owner) is the facade's job, not the
//! registry's.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A file descriptor in a registry; the unit of trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedFile {
    pub id: u64,
    pub name: String,
    pub size_gb: f64,
    pub uploader: String,
    pub seeds: u64,
    pub peers: u64,
    pub description: String,
    pub category: String,
    pub file_hash: String,
    pub upload_time: f64,
    pub is_active: bool,
    pub storage_path: String,
    /// Owner identity. Set at insertion and immutable thereafter.
    ///
    /// Serialized as `owner_address`, matching the resource dictionary form
    /// external callers (the HTTP layer this crate feeds) expect.
    #[serde(rename = "owner_address")]
    pub owner: String,
}

/// Fields supplied by a caller when publishing a new resource. `id`,
/// `owner`, and `upload_time` are assigned by the registry, not the caller.
#[derive(Debug, Clone, Default)]
pub struct NewResource {
    pub name: String,
    pub size_gb: f64,
    pub uploader: String,
    pub seeds: u64,
    pub peers: u64,
    pub description: String,
    pub category: String,
    pub file_hash: String,
    pub storage_path: String,
}

impl NewResource {
    fn into_shared_file(self, id: u64, owner: String, upload_time: f64) -> SharedFile {
        let category = if self.category.is_empty() { "general".to_string() } else { self.category };
        SharedFile {
            id,
            name: self.name,
            size_gb: self.size_gb,
            uploader: self.uploader,
            seeds: self.seeds,
            peers: self.peers,
            description: self.description,
            category,
            file_hash: self.file_hash,
            upload_time,
            is_active: true,
            storage_path: self.storage_path,
            owner,
        }
    }
}

/// A field-level patch applied via [`Registry::update`]. `None` leaves a
/// field unchanged. `id` and `owner` are not patchable by design.
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub file_hash: Option<String>,
    pub storage_path: Option<String>,
    pub is_active: Option<bool>,
}

struct Inner {
    next_id: u64,
    files: BTreeMap<u64, SharedFile>,
}

/// A keyed collection of resource descriptors, guarded by its own lock so
/// registry mutations never cross into chain or other-registry locking.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { next_id: 1, files: BTreeMap::new() }) }
    }

    /// Builds the community registry seeded with the demo resources every
    /// fresh deployment of this system ships with, owner identity `""`.
    pub fn with_demo_resources() -> Self {
        let registry = Self::new();
        let demo = [
            ("The Art of Seeding.pdf", 0.0124, "seedMaster", 42, 5, "Illustrated guide to earning wealth rewards efficiently.", "document"),
            ("Nexus OST.mp3", 0.0063, "djHyper", 18, 12, "Synthwave soundtrack to keep your node online.", "audio"),
            ("ClientSetup.zip", 0.0481, "builderBee", 33, 4, "Automation scripts to bootstrap a new seeding rig.", "software"),
        ];
        for (name, size_gb, uploader, seeds, peers, description, category) in demo {
            registry.add(
                NewResource {
                    name: name.to_string(),
                    size_gb,
                    uploader: uploader.to_string(),
                    seeds,
                    peers,
                    description: description.to_string(),
                    category: category.to_string(),
                    file_hash: String::new(),
                    storage_path: String::new(),
                },
                "",
            );
        }
        registry
    }

    /// Assigns the next id, stamps `owner` and `upload_time`, and inserts
    /// the resulting record. Not authenticated here — trust is delegated
    /// to the facade calling this with the right `owner`.
    pub fn add(&self, fields: NewResource, owner: &str) -> SharedFile {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        let file = fields.into_shared_file(id, owner.to_string(), now_ts());
        inner.files.insert(id, file.clone());
        file
    }

    /// Physically removes the record. Succeeds iff it exists and
    /// `requester == owner`.
    pub fn remove(&self, id: u64, requester: &str) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.files.get(&id) {
            Some(file) if file.owner == requester => {
                inner.files.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Applies `patch` in place. Succeeds iff the record exists and
    /// `requester == owner`. Returns the updated record.
    pub fn update(&self, id: u64, patch: ResourcePatch, requester: &str) -> Option<SharedFile> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let file = inner.files.get_mut(&id)?;
        if file.owner != requester {
            return None;
        }
        if let Some(name) = patch.name {
            file.name = name;
        }
        if let Some(description) = patch.description {
            file.description = description;
        }
        if let Some(category) = patch.category {
            file.category = category;
        }
        if let Some(file_hash) = patch.file_hash {
            file.file_hash = file_hash;
        }
        if let Some(storage_path) = patch.storage_path {
            file.storage_path = storage_path;
        }
        if let Some(is_active) = patch.is_active {
            file.is_active = is_active;
        }
        Some(file.clone())
    }

    pub fn get(&self, id: u64) -> Option<SharedFile> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).files.get(&id).cloned()
    }

    pub fn by_owner(&self, owner: &str) -> Vec<SharedFile> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .files
            .values()
            .filter(|f| f.owner == owner)
            .cloned()
            .collect()
    }

    pub fn active(&self) -> Vec<SharedFile> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .files
            .values()
            .filter(|f| f.is_active)
            .cloned()
            .collect()
    }

    /// Case-insensitive substring match against name/description for
    /// `keyword`; exact match for `category`; inclusive numeric bounds.
    /// Only active records are returned, in insertion order.
    pub fn search(&self, query: &SearchQuery) -> Vec<SharedFile> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .files
            .values()
            .filter(|f| f.is_active)
            .filter(|f| query.matches(f))
            .cloned()
            .collect()
    }

    /// Groups all records (active or not) by category tag.
    pub fn by_category(&self) -> BTreeMap<String, Vec<SharedFile>> {
        let mut groups: BTreeMap<String, Vec<SharedFile>> = BTreeMap::new();
        for file in self.inner.lock().unwrap_or_else(|e| e.into_inner()).files.values() {
            groups.entry(file.category.clone()).or_default().push(file.clone());
        }
        groups
    }

    /// Adjusts seed/peer counts, clamping to zero. Does not check
    /// ownership: downloads mutate seed counts on the owner's registry on
    /// behalf of the downloader.
    pub fn adjust_counts(&self, id: u64, seeds_delta: i64, peers_delta: i64) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.files.get_mut(&id) {
            Some(file) => {
                file.seeds = (file.seeds as i64 + seeds_delta).max(0) as u64;
                file.peers = (file.peers as i64 + peers_delta).max(0) as u64;
                true
            }
            None => false,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Search parameters for [`Registry::search`]. All fields are optional;
/// an absent field places no constraint.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub min_size_gb: Option<f64>,
    pub max_size_gb: Option<f64>,
    pub min_seeds: Option<u64>,
}

impl SearchQuery {
    fn matches(&self, file: &SharedFile) -> bool {
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            let in_name = file.name.to_lowercase().contains(&keyword);
            let in_description = file.description.to_lowercase().contains(&keyword);
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &file.category != category {
                return false;
            }
        }
        if let Some(min) = self.min_size_gb {
            if file.size_gb < min {
                return false;
            }
        }
        if let Some(max) = self.max_size_gb {
            if file.size_gb > max {
                return false;
            }
        }
        if let Some(min_seeds) = self.min_seeds {
            if file.seeds < min_seeds {
                return false;
            }
        }
        true
    }
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewResource {
        NewResource {
            name: "Guide.pdf".into(),
            size_gb: 0.025,
            uploader: "alice".into(),
            seeds: 0,
            peers: 0,
            description: "a guide".into(),
            category: "document".into(),
            file_hash: "abc".into(),
            storage_path: String::new(),
        }
    }

    #[test]
    fn add_assigns_owner_and_monotonic_ids() {
        let registry = Registry::new();
        let first = registry.add(sample(), "alice");
        let second = registry.add(sample(), "alice");
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.owner, "alice");
    }

    #[test]
    fn non_owner_cannot_remove_or_update() {
        let registry = Registry::new();
        let file = registry.add(sample(), "alice");
        assert!(!registry.remove(file.id, "bob"));
        assert!(registry.update(file.id, ResourcePatch { name: Some("x".into()), ..Default::default() }, "bob").is_none());
        assert!(registry.get(file.id).is_some());
    }

    #[test]
    fn owner_can_deactivate_without_deleting() {
        let registry = Registry::new();
        let file = registry.add(sample(), "alice");
        let updated = registry
            .update(file.id, ResourcePatch { is_active: Some(false), ..Default::default() }, "alice")
            .unwrap();
        assert!(!updated.is_active);
        assert!(registry.get(file.id).is_some());
        assert!(registry.active().is_empty());
    }

    #[test]
    fn search_bounds_are_inclusive() {
        let registry = Registry::new();
        registry.add(sample(), "alice");
        let query = SearchQuery { min_size_gb: Some(0.025), max_size_gb: Some(0.025), ..Default::default() };
        assert_eq!(registry.search(&query).len(), 1);
    }

    #[test]
    fn category_defaults_to_general() {
        let registry = Registry::new();
        let mut fields = sample();
        fields.category = String::new();
        let file = registry.add(fields, "alice");
        assert_eq!(file.category, "general");
    }

    #[test]
    fn by_category_groups_active_and_inactive_records() {
        let registry = Registry::new();
        let mut software = sample();
        software.category = "software".into();
        let file = registry.add(sample(), "alice");
        registry.add(software, "alice");
        registry.update(file.id, ResourcePatch { is_active: Some(false), ..Default::default() }, "alice");

        let groups = registry.by_category();
        assert_eq!(groups.get("document").map(Vec::len), Some(1));
        assert_eq!(groups.get("software").map(Vec::len), Some(1));
    }

    #[test]
    fn adjust_counts_clamps_at_zero() {
        let registry = Registry::new();
        let file = registry.add(sample(), "alice");
        assert!(registry.adjust_counts(file.id, -10, -10));
        let file = registry.get(file.id).unwrap();
        assert_eq!(file.seeds, 0);
        assert_eq!(file.peers, 0);
    }

    #[test]
    fn demo_registry_seeds_three_resources() {
        let registry = Registry::with_demo_resources();
        assert_eq!(registry.active().len(), 3);
    }
}
