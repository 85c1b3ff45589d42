//! Adapters implementing the domain ports.

pub mod memory;
pub mod sinks;
pub mod system;

pub use memory::{MemoryConversationStore, MokaCache};
pub use sinks::{CollectingSink, NullSink, TracingSink};
pub use system::{SystemClock, UuidGenerator};
