//! Worker domain model.
//!
//! A worker is a conversational agent advertising a set of capability tags.
//! Capability tags double as routing domains: a request requiring
//! `"mathematics"` can only land on a worker that advertises it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Registered identity and capability set of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    /// Unique worker identifier
    pub id: String,
    /// Optional human-readable display name
    pub display_name: Option<String>,
    /// Capability tags this worker advertises
    pub capabilities: BTreeSet<String>,
}

impl WorkerProfile {
    /// Create a profile from an id and capability tags.
    pub fn new<I, S>(id: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            display_name: None,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Check whether this worker advertises a capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Check whether this worker advertises every listed capability.
    pub fn has_all_capabilities<'a, I>(&self, capabilities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        capabilities.into_iter().all(|c| self.has_capability(c))
    }

    /// Name to show in merged responses: display name if set, id otherwise.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}
