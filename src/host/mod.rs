//! # Host Platform Boundary
//!
//! The flows never talk to the host platform directly. Everything they need
//! from it is expressed as two narrow collaborators:
//!
//! * [`LlmApiRegistry`]: the catalog of control capabilities that can be
//!   granted to the conversation agent, queried on every options render.
//! * [`EntryStore`]: persistence of config entries. Entries are created once
//!   by the setup flow and their options are replaced by the options flow.
//!
//! [`ConfigEntry`] is the persisted record; its serde shape is what other
//! tooling reads back.
//!
//! In-memory implementations for embedding and tests live in [`in_memory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::options::ConversationOptions;

pub mod in_memory;

pub use in_memory::{InMemoryEntryStore, StaticLlmApiRegistry};

/// A capability the host can grant to the conversation agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmApi {
    pub id: String,
    pub name: String,
}

impl LlmApi {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[mockall::automock]
pub trait LlmApiRegistry: Send + Sync {
    fn llm_apis(&self) -> Vec<LlmApi>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential data stored with an entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialData {
    pub api_key: String,
}

impl fmt::Debug for CredentialData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialData")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Everything the setup flow hands over to create an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConfigEntry {
    pub domain: String,
    pub version: u32,
    pub title: String,
    pub data: CredentialData,
    pub options: ConversationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: EntryId,
    pub domain: String,
    pub version: u32,
    pub title: String,
    pub data: CredentialData,
    pub options: ConversationOptions,
}

impl ConfigEntry {
    pub fn from_new(entry_id: EntryId, entry: NewConfigEntry) -> Self {
        Self {
            entry_id,
            domain: entry.domain,
            version: entry.version,
            title: entry.title,
            data: entry.data,
            options: entry.options,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[mockall::automock]
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn create_entry(&self, entry: NewConfigEntry) -> Result<EntryId, StoreError>;

    /// Replaces the options of an existing entry in one write.
    async fn update_options(
        &self,
        entry_id: &EntryId,
        options: ConversationOptions,
    ) -> Result<(), StoreError>;

    async fn get_entry(&self, entry_id: &EntryId) -> Result<Option<ConfigEntry>, StoreError>;
}
