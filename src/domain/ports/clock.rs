//! Port for time access.

use chrono::{DateTime, Utc};

/// Injected time source so components never read the system clock directly.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}
