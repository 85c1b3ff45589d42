//! Worker registry and capability index.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::domain::models::WorkerProfile;
use crate::domain::ports::ChatWorker;

struct RegisteredWorker {
    profile: WorkerProfile,
    handle: Arc<dyn ChatWorker>,
}

/// Maps worker ids to handles and maintains a capability -> worker-set
/// index. The index is kept bidirectionally consistent with registrations:
/// every indexed capability belongs to a registered worker and vice versa.
///
/// Lookups by id are O(1) in the number of workers; capability lookups are
/// O(k) in the size of the requested capability set. Iteration order is
/// deterministic (lexicographic by worker id), which downstream selection
/// logic relies on.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<String, RegisteredWorker>,
    by_capability: BTreeMap<String, BTreeSet<String>>,
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker, replacing any prior registration under the same
    /// id. The capability index is updated to match.
    pub fn register(&mut self, worker: Arc<dyn ChatWorker>) {
        let id = worker.id().to_string();
        self.unindex(&id);

        let mut profile = WorkerProfile::new(&id, worker.capabilities());
        if let Some(name) = worker.display_name() {
            profile = profile.with_display_name(name);
        }

        for capability in &profile.capabilities {
            self.by_capability
                .entry(capability.clone())
                .or_default()
                .insert(id.clone());
        }

        self.workers.insert(
            id,
            RegisteredWorker {
                profile,
                handle: worker,
            },
        );
    }

    /// Remove a worker and its index entries.
    pub fn deregister(&mut self, id: &str) -> bool {
        self.unindex(id);
        self.workers.remove(id).is_some()
    }

    fn unindex(&mut self, id: &str) {
        if let Some(existing) = self.workers.get(id) {
            let capabilities: Vec<String> =
                existing.profile.capabilities.iter().cloned().collect();
            for capability in capabilities {
                if let Some(set) = self.by_capability.get_mut(&capability) {
                    set.remove(id);
                    if set.is_empty() {
                        self.by_capability.remove(&capability);
                    }
                }
            }
        }
    }

    /// Profile of a registered worker.
    pub fn get(&self, id: &str) -> Option<&WorkerProfile> {
        self.workers.get(id).map(|w| &w.profile)
    }

    /// Dispatch handle of a registered worker.
    pub fn handle(&self, id: &str) -> Option<Arc<dyn ChatWorker>> {
        self.workers.get(id).map(|w| Arc::clone(&w.handle))
    }

    /// Whether a worker id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.workers.contains_key(id)
    }

    /// Capability tags of a registered worker. Empty for unknown ids.
    pub fn capabilities_of(&self, id: &str) -> Vec<String> {
        self.workers
            .get(id)
            .map(|w| w.profile.capabilities.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Workers advertising every requested capability, in id order.
    ///
    /// Computed as the intersection of the per-capability sets; if any
    /// requested capability has no registrants the result is empty. An
    /// empty capability list matches every registered worker.
    pub fn find_by_capabilities(&self, capabilities: &[String]) -> Vec<&WorkerProfile> {
        if capabilities.is_empty() {
            return self.workers.values().map(|w| &w.profile).collect();
        }

        let mut sets = Vec::with_capacity(capabilities.len());
        for capability in capabilities {
            match self.by_capability.get(capability) {
                Some(set) => sets.push(set),
                None => return Vec::new(),
            }
        }

        let Some((first, rest)) = sets.split_first() else {
            return Vec::new();
        };
        first
            .iter()
            .filter(|id| rest.iter().all(|set| set.contains(*id)))
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// All registered worker ids, in order.
    pub fn worker_ids(&self) -> impl Iterator<Item = &str> {
        self.workers.keys().map(String::as_str)
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
