//! Form schemas rendered by the host for each flow step.
//!
//! Generation is pure: the same draft and capability list always yield the
//! same schema.

use serde::Serialize;
use serde_json::{json, Value};

use crate::{constants::*, host::LlmApi, options::OptionsDraft};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FormSchema {
    pub fields: Vec<SchemaField>,
}

impl FormSchema {
    pub fn field(&self, key: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.key.as_str()).collect()
    }

    pub fn has_advanced_fields(&self) -> bool {
        ADVANCED_KEYS.iter().any(|key| self.field(key).is_some())
    }
}

const ADVANCED_KEYS: [&str; 4] = [
    CONF_CHAT_MODEL,
    CONF_MAX_TOKENS,
    CONF_TOP_P,
    CONF_TEMPERATURE,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub key: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Value>,
    pub selector: Selector,
}

impl SchemaField {
    pub fn required(key: &str, selector: Selector) -> Self {
        Self {
            key: key.to_string(),
            required: true,
            default: None,
            suggested_value: None,
            selector,
        }
    }

    pub fn optional(key: &str, selector: Selector) -> Self {
        Self {
            required: false,
            ..Self::required(key, selector)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_suggested(mut self, suggested: Option<Value>) -> Self {
        self.suggested_value = suggested;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selector {
    Text,
    /// Free text that may contain host template syntax.
    Template,
    Boolean,
    Integer,
    Select { options: Vec<SelectOption> },
    /// Rendered as a slider.
    Number { min: f64, max: f64, step: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Schema of the setup step: a single required API key.
pub fn user_step_schema() -> FormSchema {
    FormSchema {
        fields: vec![SchemaField::required(CONF_API_KEY, Selector::Text)],
    }
}

/// Schema of the options step.
///
/// Tuning fields are only included while `recommended` is off.
pub fn conversation_option_schema(draft: &OptionsDraft, apis: &[LlmApi]) -> FormSchema {
    let mut api_options = vec![SelectOption {
        label: LLM_API_NONE_LABEL.to_string(),
        value: LLM_API_NONE.to_string(),
    }];
    api_options.extend(apis.iter().map(|api| SelectOption {
        label: api.name.clone(),
        value: api.id.clone(),
    }));

    let prompt = draft
        .prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS_PROMPT.to_string());

    let mut fields = vec![
        SchemaField::optional(CONF_PROMPT, Selector::Template).with_suggested(Some(json!(prompt))),
        SchemaField::optional(
            CONF_LLM_HASS_API,
            Selector::Select {
                options: api_options,
            },
        )
        .with_suggested(draft.llm_hass_api.clone().map(Value::String))
        .with_default(json!(LLM_API_NONE)),
        SchemaField::required(CONF_RECOMMENDED, Selector::Boolean)
            .with_default(json!(draft.recommended)),
    ];

    if draft.recommended {
        return FormSchema { fields };
    }

    let tuning = draft.tuning.as_ref();
    fields.extend([
        SchemaField::optional(CONF_CHAT_MODEL, Selector::Text)
            .with_suggested(tuning.map(|t| json!(t.chat_model)))
            .with_default(json!(RECOMMENDED_CHAT_MODEL)),
        SchemaField::optional(CONF_MAX_TOKENS, Selector::Integer)
            .with_suggested(tuning.map(|t| json!(t.max_tokens)))
            .with_default(json!(RECOMMENDED_MAX_TOKENS)),
        SchemaField::optional(CONF_TOP_P, slider(TOP_P_RANGE))
            .with_suggested(tuning.map(|t| json!(t.top_p)))
            .with_default(json!(RECOMMENDED_TOP_P)),
        SchemaField::optional(CONF_TEMPERATURE, slider(TEMPERATURE_RANGE))
            .with_suggested(tuning.map(|t| json!(t.temperature)))
            .with_default(json!(RECOMMENDED_TEMPERATURE)),
    ]);

    FormSchema { fields }
}

fn slider((min, max): (f64, f64)) -> Selector {
    Selector::Number {
        min,
        max,
        step: SLIDER_STEP,
    }
}
