//! Identifiers, option keys and built-in defaults shared by both flows.

use serde::{Deserialize, Serialize};

pub const DOMAIN: &str = "deepseek_conversation";

/// Title given to every entry created by the setup flow.
pub const DEFAULT_TITLE: &str = "DeepSeek";

/// Version stamped on created entries.
pub const CONFIG_VERSION: u32 = 1;

pub const CONF_API_KEY: &str = "api_key";
pub const CONF_RECOMMENDED: &str = "recommended";
pub const CONF_PROMPT: &str = "prompt";
pub const CONF_LLM_HASS_API: &str = "llm_hass_api";
pub const CONF_CHAT_MODEL: &str = "chat_model";
pub const CONF_MAX_TOKENS: &str = "max_tokens";
pub const CONF_TOP_P: &str = "top_p";
pub const CONF_TEMPERATURE: &str = "temperature";

pub const RECOMMENDED_CHAT_MODEL: &str = "deepseek-chat";
pub const RECOMMENDED_MAX_TOKENS: u32 = 4096;
pub const RECOMMENDED_TOP_P: f64 = 1.0;
pub const RECOMMENDED_TEMPERATURE: f64 = 0.7;

pub const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
pub const SLIDER_STEP: f64 = 0.05;

/// Capability id of the host's built-in "Assist" control API.
pub const LLM_API_ASSIST: &str = "assist";

/// Selection value meaning "no capability granted". Never persisted.
pub const LLM_API_NONE: &str = "none";
pub const LLM_API_NONE_LABEL: &str = "No control";

pub const DEFAULT_INSTRUCTIONS_PROMPT: &str = "You are a voice assistant for Home Assistant.
Answer questions about the world truthfully.
Answer in plain text. Keep it simple and to the point.
";

pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_VALIDATION_TIMEOUT_MS: u64 = 10_000;

/// How the integration talks to its backend, as reported to the host.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    PartialEq,
    Eq,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionClass {
    #[default]
    CloudPolling,
    CloudPush,
    LocalPolling,
    LocalPush,
}

pub const CONNECTION_CLASS: ConnectionClass = ConnectionClass::CloudPolling;
