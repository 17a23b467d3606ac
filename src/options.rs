//! Conversation options owned by a config entry.
//!
//! [`ConversationOptions`] is the persisted value. It is a tagged variant so a
//! recommended-mode record cannot carry tuning fields at all; the flat JSON
//! shape other tooling reads is produced through [`OptionsRecord`].
//!
//! [`OptionsDraft`] is what the options form is rendered from. It may hold a
//! partially filled state (for example advanced mode with no tuning values
//! yet) that is never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{constants::*, error::FieldError, flow::FormInput};

pub type FieldErrors = BTreeMap<String, FieldError>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid option {field}: {error}")]
pub struct OptionsError {
    pub field: String,
    pub error: FieldError,
}

/// Fields present in both modes.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseOptions {
    pub prompt: String,
    /// Granted capability id; `None` means no control.
    pub llm_hass_api: Option<String>,
}

impl BaseOptions {
    /// Builds base options, folding the `"none"` selection into `None`.
    pub fn new(prompt: impl Into<String>, llm_hass_api: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            llm_hass_api: llm_hass_api.filter(|api| api != LLM_API_NONE),
        }
    }
}

impl Default for BaseOptions {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTIONS_PROMPT, None)
    }
}

/// Sampling parameters only available in advanced mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningOptions {
    pub chat_model: String,
    pub max_tokens: u32,
    pub top_p: f64,
    pub temperature: f64,
}

impl Default for TuningOptions {
    fn default() -> Self {
        Self {
            chat_model: RECOMMENDED_CHAT_MODEL.to_string(),
            max_tokens: RECOMMENDED_MAX_TOKENS,
            top_p: RECOMMENDED_TOP_P,
            temperature: RECOMMENDED_TEMPERATURE,
        }
    }
}

impl TuningOptions {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.max_tokens == 0 {
            errors.insert(CONF_MAX_TOKENS.to_string(), FieldError::OutOfRange);
        }
        if !in_range(self.top_p, TOP_P_RANGE) {
            errors.insert(CONF_TOP_P.to_string(), FieldError::OutOfRange);
        }
        if !in_range(self.temperature, TEMPERATURE_RANGE) {
            errors.insert(CONF_TEMPERATURE.to_string(), FieldError::OutOfRange);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OptionsRecord", into = "OptionsRecord")]
pub enum ConversationOptions {
    Recommended(BaseOptions),
    Advanced(BaseOptions, TuningOptions),
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self::recommended()
    }
}

impl ConversationOptions {
    /// The bundle every new entry starts with.
    pub fn recommended() -> Self {
        ConversationOptions::Recommended(BaseOptions::new(
            DEFAULT_INSTRUCTIONS_PROMPT,
            Some(LLM_API_ASSIST.to_string()),
        ))
    }

    pub fn is_recommended(&self) -> bool {
        matches!(self, ConversationOptions::Recommended(_))
    }

    pub fn base(&self) -> &BaseOptions {
        match self {
            ConversationOptions::Recommended(base) => base,
            ConversationOptions::Advanced(base, _) => base,
        }
    }

    pub fn tuning(&self) -> Option<&TuningOptions> {
        match self {
            ConversationOptions::Recommended(_) => None,
            ConversationOptions::Advanced(_, tuning) => Some(tuning),
        }
    }

    /// Tuning values in effect; recommended mode implies the defaults.
    pub fn effective_tuning(&self) -> TuningOptions {
        self.tuning().cloned().unwrap_or_default()
    }
}

/// Flat, persisted shape of [`ConversationOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsRecord {
    #[serde(default)]
    pub recommended: bool,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_hass_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

fn default_prompt() -> String {
    DEFAULT_INSTRUCTIONS_PROMPT.to_string()
}

impl TryFrom<OptionsRecord> for ConversationOptions {
    type Error = OptionsError;

    fn try_from(record: OptionsRecord) -> Result<Self, Self::Error> {
        let base = BaseOptions::new(record.prompt, record.llm_hass_api);
        if record.recommended {
            return Ok(ConversationOptions::Recommended(base));
        }

        let defaults = TuningOptions::default();
        let tuning = TuningOptions {
            chat_model: record.chat_model.unwrap_or(defaults.chat_model),
            max_tokens: record.max_tokens.unwrap_or(defaults.max_tokens),
            top_p: record.top_p.unwrap_or(defaults.top_p),
            temperature: record.temperature.unwrap_or(defaults.temperature),
        };
        if let Err(errors) = tuning.validate() {
            if let Some((field, error)) = errors.into_iter().next() {
                return Err(OptionsError { field, error });
            }
        }
        Ok(ConversationOptions::Advanced(base, tuning))
    }
}

impl From<ConversationOptions> for OptionsRecord {
    fn from(options: ConversationOptions) -> Self {
        match options {
            ConversationOptions::Recommended(base) => OptionsRecord {
                recommended: true,
                prompt: base.prompt,
                llm_hass_api: base.llm_hass_api,
                chat_model: None,
                max_tokens: None,
                top_p: None,
                temperature: None,
            },
            ConversationOptions::Advanced(base, tuning) => OptionsRecord {
                recommended: false,
                prompt: base.prompt,
                llm_hass_api: base.llm_hass_api,
                chat_model: Some(tuning.chat_model),
                max_tokens: Some(tuning.max_tokens),
                top_p: Some(tuning.top_p),
                temperature: Some(tuning.temperature),
            },
        }
    }
}

/// Render state of the options form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionsDraft {
    pub recommended: bool,
    pub prompt: Option<String>,
    /// Raw selection as last shown, `"none"` included.
    pub llm_hass_api: Option<String>,
    pub tuning: Option<TuningOptions>,
}

impl OptionsDraft {
    /// Copies the well-typed values of a rejected submission into the draft
    /// so the re-rendered form keeps what was entered. The mode is unchanged
    /// and tuning values are only taken in advanced mode.
    pub fn absorb(&mut self, input: &FormInput) {
        if let Some(Value::String(prompt)) = input.get(CONF_PROMPT) {
            self.prompt = Some(prompt.clone());
        }
        if let Some(Value::String(api)) = input.get(CONF_LLM_HASS_API) {
            self.llm_hass_api = Some(api.clone());
        }
        if self.recommended || !TUNING_KEYS.iter().any(|key| input.contains_key(*key)) {
            return;
        }

        let tuning = self.tuning.get_or_insert_with(TuningOptions::default);
        if let Some(Value::String(model)) = input.get(CONF_CHAT_MODEL) {
            tuning.chat_model = model.clone();
        }
        if let Some(max_tokens) = input
            .get(CONF_MAX_TOKENS)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
        {
            tuning.max_tokens = max_tokens;
        }
        if let Some(top_p) = input.get(CONF_TOP_P).and_then(Value::as_f64) {
            tuning.top_p = top_p;
        }
        if let Some(temperature) = input.get(CONF_TEMPERATURE).and_then(Value::as_f64) {
            tuning.temperature = temperature;
        }
    }
}

const TUNING_KEYS: [&str; 4] = [CONF_CHAT_MODEL, CONF_MAX_TOKENS, CONF_TOP_P, CONF_TEMPERATURE];

impl From<&ConversationOptions> for OptionsDraft {
    fn from(options: &ConversationOptions) -> Self {
        let base = options.base();
        Self {
            recommended: options.is_recommended(),
            prompt: Some(base.prompt.clone()),
            llm_hass_api: base.llm_hass_api.clone(),
            tuning: options.tuning().cloned(),
        }
    }
}

/// A parsed options-form submission.
///
/// Tuning fields stay raw until [`OptionsSubmission::into_options`] so that a
/// mode toggle never fails on values the user could not see.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsSubmission {
    pub recommended: bool,
    pub prompt: Option<String>,
    pub llm_hass_api: String,
    chat_model: Option<Value>,
    max_tokens: Option<Value>,
    top_p: Option<Value>,
    temperature: Option<Value>,
}

impl OptionsSubmission {
    pub fn parse(input: &FormInput) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let recommended = match input.get(CONF_RECOMMENDED) {
            Some(Value::Bool(flag)) => Some(*flag),
            Some(_) => {
                errors.insert(CONF_RECOMMENDED.to_string(), FieldError::InvalidType);
                None
            }
            None => {
                errors.insert(CONF_RECOMMENDED.to_string(), FieldError::Required);
                None
            }
        };
        let prompt = optional_string(input, CONF_PROMPT, &mut errors);
        let llm_hass_api = optional_string(input, CONF_LLM_HASS_API, &mut errors)
            .unwrap_or_else(|| LLM_API_NONE.to_string());

        match recommended {
            Some(recommended) if errors.is_empty() => Ok(Self {
                recommended,
                prompt,
                llm_hass_api,
                chat_model: present(input, CONF_CHAT_MODEL),
                max_tokens: present(input, CONF_MAX_TOKENS),
                top_p: present(input, CONF_TOP_P),
                temperature: present(input, CONF_TEMPERATURE),
            }),
            _ => Err(errors),
        }
    }

    /// The draft a mode toggle re-renders: recommended, prompt and the
    /// capability selection only.
    pub fn narrowed(&self) -> OptionsDraft {
        OptionsDraft {
            recommended: self.recommended,
            prompt: self.prompt.clone(),
            llm_hass_api: Some(self.llm_hass_api.clone()),
            tuning: None,
        }
    }

    /// Converts a final submission into the value to persist.
    pub fn into_options(self) -> Result<ConversationOptions, FieldErrors> {
        let base = BaseOptions::new(
            self.prompt.unwrap_or_else(default_prompt),
            Some(self.llm_hass_api),
        );
        if self.recommended {
            return Ok(ConversationOptions::Recommended(base));
        }

        let mut errors = FieldErrors::new();
        let defaults = TuningOptions::default();
        let chat_model = match self.chat_model {
            None => defaults.chat_model,
            Some(Value::String(model)) => model,
            Some(_) => {
                errors.insert(CONF_CHAT_MODEL.to_string(), FieldError::InvalidType);
                defaults.chat_model
            }
        };
        let max_tokens = match self.max_tokens {
            None => defaults.max_tokens,
            Some(Value::Number(number)) => match number.as_u64() {
                Some(value) => u32::try_from(value).unwrap_or_else(|_| {
                    errors.insert(CONF_MAX_TOKENS.to_string(), FieldError::OutOfRange);
                    defaults.max_tokens
                }),
                None if number.is_i64() => {
                    errors.insert(CONF_MAX_TOKENS.to_string(), FieldError::OutOfRange);
                    defaults.max_tokens
                }
                None => {
                    errors.insert(CONF_MAX_TOKENS.to_string(), FieldError::InvalidType);
                    defaults.max_tokens
                }
            },
            Some(_) => {
                errors.insert(CONF_MAX_TOKENS.to_string(), FieldError::InvalidType);
                defaults.max_tokens
            }
        };
        let top_p = number_or(self.top_p, CONF_TOP_P, defaults.top_p, &mut errors);
        let temperature = number_or(
            self.temperature,
            CONF_TEMPERATURE,
            defaults.temperature,
            &mut errors,
        );

        let tuning = TuningOptions {
            chat_model,
            max_tokens,
            top_p,
            temperature,
        };
        if let Err(range_errors) = tuning.validate() {
            for (field, error) in range_errors {
                errors.entry(field).or_insert(error);
            }
        }

        if errors.is_empty() {
            Ok(ConversationOptions::Advanced(base, tuning))
        } else {
            Err(errors)
        }
    }
}

fn optional_string(input: &FormInput, key: &str, errors: &mut FieldErrors) -> Option<String> {
    match input.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value.clone()),
        Some(_) => {
            errors.insert(key.to_string(), FieldError::InvalidType);
            None
        }
    }
}

fn present(input: &FormInput, key: &str) -> Option<Value> {
    input.get(key).filter(|value| !value.is_null()).cloned()
}

fn number_or(value: Option<Value>, key: &str, default: f64, errors: &mut FieldErrors) -> f64 {
    match value {
        None => default,
        Some(value) => value.as_f64().unwrap_or_else(|| {
            errors.insert(key.to_string(), FieldError::InvalidType);
            default
        }),
    }
}
