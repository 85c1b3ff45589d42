//! Port for identifier generation.

/// Injected id source so components never call a UUID library directly.
pub trait IdGenerator: Send + Sync {
    /// A new unique identifier.
    fn generate(&self) -> String;
}
