//! Port for conversational workers.

use async_trait::async_trait;

use crate::domain::error::HandoffError;

/// A conversational agent advertising a capability set.
///
/// Implementations wrap whatever actually produces text (an LLM provider, a
/// rules engine, a test stub). Chat failures surface as
/// [`HandoffError::Provider`] so the fallback layer can classify them.
#[async_trait]
pub trait ChatWorker: Send + Sync {
    /// Unique worker identifier.
    fn id(&self) -> &str;

    /// Optional human-readable name for merged responses.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Capability tags this worker advertises.
    fn capabilities(&self) -> Vec<String>;

    /// Produce a response for one conversational turn.
    async fn chat(&self, input: &str) -> Result<String, HandoffError>;
}
