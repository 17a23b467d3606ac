//! Options flow for an existing entry.
//!
//! The form shows tuning fields only in advanced mode. Flipping the
//! `recommended` toggle is not a save: the flow re-renders with the field set
//! for the new mode and waits for another submission. A submission is treated
//! as final when its `recommended` value matches what was last rendered.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{field_errors, FlowHandler, FlowResult, FormErrors, FormInput};
use crate::{
    error::{FlowError, FlowOutcome},
    host::{ConfigEntry, EntryId, EntryStore, LlmApiRegistry},
    options::{OptionsDraft, OptionsSubmission},
    schema::conversation_option_schema,
};

pub struct DeepSeekOptionsFlow {
    entry_id: EntryId,
    draft: OptionsDraft,
    last_rendered_recommended: bool,
    registry: Arc<dyn LlmApiRegistry>,
    store: Arc<dyn EntryStore>,
}

impl DeepSeekOptionsFlow {
    pub const STEP_INIT: &'static str = "init";

    pub fn new(
        entry: &ConfigEntry,
        registry: Arc<dyn LlmApiRegistry>,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        Self {
            entry_id: entry.entry_id.clone(),
            draft: OptionsDraft::from(&entry.options),
            last_rendered_recommended: entry.options.is_recommended(),
            registry,
            store,
        }
    }

    pub fn entry_id(&self) -> &EntryId {
        &self.entry_id
    }

    /// Options the next render is built from.
    pub fn draft(&self) -> &OptionsDraft {
        &self.draft
    }

    pub fn last_rendered_recommended(&self) -> bool {
        self.last_rendered_recommended
    }

    pub fn is_final_submission(&self, submission: &OptionsSubmission) -> bool {
        submission.recommended == self.last_rendered_recommended
    }

    /// Handles the `init` step.
    #[instrument(level = "debug", skip_all, fields(entry_id = %self.entry_id))]
    pub async fn step_init(&mut self, user_input: Option<FormInput>) -> FlowOutcome<FlowResult> {
        let Some(input) = user_input else {
            return Ok(self.show_form(FormErrors::new()));
        };

        let submission = match OptionsSubmission::parse(&input) {
            Ok(submission) => submission,
            Err(errors) => {
                debug!(?errors, "rejected options submission");
                self.draft.absorb(&input);
                return Ok(self.show_form(field_errors(errors)));
            }
        };

        if self.is_final_submission(&submission) {
            return match submission.into_options() {
                Ok(options) => {
                    self.store.update_options(&self.entry_id, options).await?;
                    info!("saved options");
                    Ok(FlowResult::CreateEntry {
                        title: String::new(),
                        entry_id: self.entry_id.clone(),
                    })
                }
                Err(errors) => {
                    debug!(?errors, "rejected options submission");
                    self.draft.absorb(&input);
                    Ok(self.show_form(field_errors(errors)))
                }
            };
        }

        debug!(
            recommended = submission.recommended,
            "recommended toggled, re-rendering"
        );
        self.last_rendered_recommended = submission.recommended;
        self.draft = submission.narrowed();
        Ok(self.show_form(FormErrors::new()))
    }

    fn show_form(&self, errors: FormErrors) -> FlowResult {
        let apis = self.registry.llm_apis();
        FlowResult::form(
            Self::STEP_INIT,
            conversation_option_schema(&self.draft, &apis),
            errors,
        )
    }
}

#[async_trait]
impl FlowHandler for DeepSeekOptionsFlow {
    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<FormInput>,
    ) -> FlowOutcome<FlowResult> {
        match step_id {
            Self::STEP_INIT => self.step_init(user_input).await,
            other => Err(FlowError::UnknownStep(other.to_string())),
        }
    }
}
