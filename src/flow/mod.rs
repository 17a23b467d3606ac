//! # Config Flows
//!
//! A flow is a short-lived, step-based wizard driven by the host. Each call to
//! a step either renders a form (possibly with errors) or finishes the flow.
//!
//! * [`setup::DeepSeekConfigFlow`] collects and validates an API key, then
//!   creates the entry (step `user`).
//! * [`options::DeepSeekOptionsFlow`] edits the options of an existing entry
//!   (step `init`), re-rendering whenever the recommended toggle flips.
//!
//! User mistakes and failed validation never surface as `Err`; they come back
//! as [`FlowResult::Form`] with error tags. `Err` is reserved for failures of
//! the host collaborators or unknown step ids.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    constants::DOMAIN,
    error::{BaseError, FlowOutcome},
    host::EntryId,
    options::FieldErrors,
    schema::FormSchema,
};

pub mod options;
pub mod setup;

pub use options::DeepSeekOptionsFlow;
pub use setup::DeepSeekConfigFlow;

/// Values submitted through a rendered form.
pub type FormInput = serde_json::Map<String, serde_json::Value>;

/// Error tags keyed by field name, or by `base` for form-level errors.
pub type FormErrors = BTreeMap<String, String>;

pub const BASE_ERROR_KEY: &str = "base";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult {
    Form {
        step_id: String,
        data_schema: FormSchema,
        errors: FormErrors,
    },
    /// Terminal step. The options flow reports an empty title.
    CreateEntry { title: String, entry_id: EntryId },
}

impl FlowResult {
    pub fn form(step_id: &str, data_schema: FormSchema, errors: FormErrors) -> Self {
        FlowResult::Form {
            step_id: step_id.to_string(),
            data_schema,
            errors,
        }
    }

    pub fn is_form(&self) -> bool {
        matches!(self, FlowResult::Form { .. })
    }

    pub fn errors(&self) -> Option<&FormErrors> {
        match self {
            FlowResult::Form { errors, .. } => Some(errors),
            FlowResult::CreateEntry { .. } => None,
        }
    }

    pub fn base_error(&self) -> Option<&str> {
        self.errors()
            .and_then(|errors| errors.get(BASE_ERROR_KEY))
            .map(String::as_str)
    }

    pub fn schema(&self) -> Option<&FormSchema> {
        match self {
            FlowResult::Form { data_schema, .. } => Some(data_schema),
            FlowResult::CreateEntry { .. } => None,
        }
    }
}

pub(crate) fn base_errors(error: BaseError) -> FormErrors {
    FormErrors::from([(BASE_ERROR_KEY.to_string(), error.to_string())])
}

pub(crate) fn field_errors(errors: FieldErrors) -> FormErrors {
    errors
        .into_iter()
        .map(|(field, error)| (field, error.to_string()))
        .collect()
}

/// Step dispatch used by the host to drive a flow by step id.
#[async_trait]
pub trait FlowHandler: Send {
    fn handler_domain(&self) -> &str {
        DOMAIN
    }

    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<FormInput>,
    ) -> FlowOutcome<FlowResult>;
}
