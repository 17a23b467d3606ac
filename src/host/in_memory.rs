//! In-memory host collaborators.
//!
//! Entries are kept in a DashMap shared between clones, so a store handed to
//! a flow and the one kept by the caller see the same data. Data is lost
//! when the process exits.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::{ConfigEntry, EntryId, EntryStore, LlmApi, LlmApiRegistry, NewConfigEntry, StoreError};
use crate::options::ConversationOptions;

#[derive(Clone, Default)]
pub struct InMemoryEntryStore {
    entries: Arc<DashMap<EntryId, ConfigEntry>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a fully formed entry, replacing any entry with the same id.
    pub fn insert(&self, entry: ConfigEntry) {
        self.entries.insert(entry.entry_id.clone(), entry);
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn create_entry(&self, entry: NewConfigEntry) -> Result<EntryId, StoreError> {
        let entry_id = EntryId::new();
        debug!(%entry_id, title = %entry.title, "creating config entry");
        self.entries
            .insert(entry_id.clone(), ConfigEntry::from_new(entry_id.clone(), entry));
        Ok(entry_id)
    }

    async fn update_options(
        &self,
        entry_id: &EntryId,
        options: ConversationOptions,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| StoreError::NotFound(entry_id.clone()))?;
        debug!(%entry_id, recommended = options.is_recommended(), "updating options");
        entry.options = options;
        Ok(())
    }

    async fn get_entry(&self, entry_id: &EntryId) -> Result<Option<ConfigEntry>, StoreError> {
        Ok(self.entries.get(entry_id).map(|entry| entry.clone()))
    }
}

/// Registry serving a fixed capability list.
#[derive(Debug, Clone, Default)]
pub struct StaticLlmApiRegistry {
    apis: Vec<LlmApi>,
}

impl StaticLlmApiRegistry {
    pub fn new(apis: Vec<LlmApi>) -> Self {
        Self { apis }
    }

    /// A registry exposing only the built-in Assist API.
    pub fn assist_only() -> Self {
        Self::new(vec![LlmApi::new(crate::constants::LLM_API_ASSIST, "Assist")])
    }
}

impl LlmApiRegistry for StaticLlmApiRegistry {
    fn llm_apis(&self) -> Vec<LlmApi> {
        self.apis.clone()
    }
}
