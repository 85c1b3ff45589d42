//! Port for conversation state storage.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::models::HandoffRecord;

/// Storage for per-conversation handoff history and context.
///
/// History is append-only and ordered. Implementations must serialize
/// appends within one conversation id so the cycle scan and the handoff
/// ceiling observe a consistent history; operations on different
/// conversations must not contend. Truncation and expiry are the
/// implementation's concern, not the engine's.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append an admitted handoff to a conversation's history.
    async fn append_handoff(&self, conversation_id: &str, record: HandoffRecord) -> Result<()>;

    /// Full handoff history of a conversation, oldest first.
    async fn history(&self, conversation_id: &str) -> Result<Vec<HandoffRecord>>;

    /// Replace the stored context of a conversation.
    async fn save_context(
        &self,
        conversation_id: &str,
        context: &HashMap<String, serde_json::Value>,
    ) -> Result<()>;

    /// Load the stored context of a conversation. Empty map if none saved.
    async fn load_context(
        &self,
        conversation_id: &str,
    ) -> Result<HashMap<String, serde_json::Value>>;
}
