//! # DeepSeek Conversation: Config Flows
//!
//! Setup and options flows for a DeepSeek-backed conversation agent hosted by
//! a home automation platform.
//!
//! ## Flows
//!
//! - Setup ([`flow::DeepSeekConfigFlow`]): asks for an API key, validates it
//!   by listing models on the DeepSeek API ([`validation`]) and creates a
//!   config entry with the recommended options.
//! - Options ([`flow::DeepSeekOptionsFlow`]): edits the prompt, the granted
//!   control capability and, in advanced mode, the sampling parameters.
//!
//! ## Host Boundary
//!
//! The host platform is reached only through the collaborators in [`host`]:
//! a capability registry and an entry store. Forms are described by
//! [`schema`] and rendered by the host.
//!
//! ## Data
//!
//! Options are a tagged variant ([`options::ConversationOptions`]) so a
//! recommended-mode entry never carries tuning values. Their persisted JSON
//! shape is flat and omits `llm_hass_api` when no capability is granted.

pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod host;
pub mod options;
pub mod schema;
pub mod validation;

// Re-exports
pub use error::*;
pub use flow::{DeepSeekConfigFlow, DeepSeekOptionsFlow, FlowHandler, FlowResult, FormInput};
pub use options::ConversationOptions;
