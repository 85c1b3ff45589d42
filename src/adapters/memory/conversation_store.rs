//! In-memory conversation store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::models::HandoffRecord;
use crate::domain::ports::ConversationStore;

#[derive(Default)]
struct ConversationState {
    history: Vec<HandoffRecord>,
    context: HashMap<String, serde_json::Value>,
}

/// Conversation store holding history and context in process memory.
///
/// Each conversation owns its own lock: operations within one conversation
/// id serialize, operations across conversations do not contend beyond the
/// brief map access.
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, conversation_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(state) = self.conversations.read().await.get(conversation_id) {
            return Arc::clone(state);
        }
        let mut map = self.conversations.write().await;
        Arc::clone(map.entry(conversation_id.to_string()).or_default())
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn append_handoff(&self, conversation_id: &str, record: HandoffRecord) -> Result<()> {
        let state = self.entry(conversation_id).await;
        state.lock().await.history.push(record);
        Ok(())
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<HandoffRecord>> {
        let state = self.entry(conversation_id).await;
        let guard = state.lock().await;
        Ok(guard.history.clone())
    }

    async fn save_context(
        &self,
        conversation_id: &str,
        context: &HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        let state = self.entry(conversation_id).await;
        state.lock().await.context = context.clone();
        Ok(())
    }

    async fn load_context(
        &self,
        conversation_id: &str,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let state = self.entry(conversation_id).await;
        let guard = state.lock().await;
        Ok(guard.context.clone())
    }
}
