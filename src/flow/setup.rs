//! Setup flow: collect an API key, validate it, create the entry.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use super::{base_errors, DeepSeekOptionsFlow, FlowHandler, FlowResult, FormErrors, FormInput};
use crate::{
    config::IntegrationConfig,
    constants::{CONF_API_KEY, CONFIG_VERSION, DEFAULT_TITLE, DOMAIN},
    error::{BaseError, FlowError, FlowOutcome},
    host::{ConfigEntry, CredentialData, EntryStore, LlmApiRegistry, NewConfigEntry},
    options::ConversationOptions,
    schema::user_step_schema,
    validation::{ApiCredential, CredentialError, CredentialValidator, DeepSeekValidator},
};

pub struct DeepSeekConfigFlow {
    config: IntegrationConfig,
    validator: Arc<dyn CredentialValidator>,
    store: Arc<dyn EntryStore>,
    registry: Arc<dyn LlmApiRegistry>,
}

impl DeepSeekConfigFlow {
    pub const STEP_USER: &'static str = "user";

    pub fn new(
        config: IntegrationConfig,
        validator: Arc<dyn CredentialValidator>,
        store: Arc<dyn EntryStore>,
        registry: Arc<dyn LlmApiRegistry>,
    ) -> Self {
        Self {
            config,
            validator,
            store,
            registry,
        }
    }

    /// A flow validating against the DeepSeek API described by `config`.
    pub fn with_deepseek(
        config: IntegrationConfig,
        store: Arc<dyn EntryStore>,
        registry: Arc<dyn LlmApiRegistry>,
    ) -> Self {
        let validator = Arc::new(DeepSeekValidator::new(&config));
        Self::new(config, validator, store, registry)
    }

    /// Handles the `user` step.
    ///
    /// Without a usable API key the blank form is rendered and nothing is
    /// validated. A key that passes validation creates the entry with the
    /// recommended options; any failure re-renders the form with a `base`
    /// error tag.
    #[instrument(level = "debug", skip_all)]
    pub async fn step_user(&mut self, user_input: Option<FormInput>) -> FlowOutcome<FlowResult> {
        let Some(api_key) = user_input.as_ref().and_then(submitted_api_key) else {
            return Ok(Self::show_form(FormErrors::new()));
        };

        let data = CredentialData { api_key };
        match self.validate(ApiCredential::from(data.clone())).await {
            Ok(()) => {
                let entry_id = self
                    .store
                    .create_entry(NewConfigEntry {
                        domain: DOMAIN.to_string(),
                        version: CONFIG_VERSION,
                        title: DEFAULT_TITLE.to_string(),
                        data,
                        options: ConversationOptions::recommended(),
                    })
                    .await?;
                info!(%entry_id, "created DeepSeek entry");
                Ok(FlowResult::CreateEntry {
                    title: DEFAULT_TITLE.to_string(),
                    entry_id,
                })
            }
            Err(validation_error) => {
                let tag = BaseError::from(&validation_error);
                if tag == BaseError::Unknown {
                    error!(
                        error = ?validation_error,
                        "Unexpected exception while validating API key"
                    );
                } else {
                    debug!(error = %validation_error, "API key rejected");
                }
                Ok(Self::show_form(base_errors(tag)))
            }
        }
    }

    /// Runs the validator on a worker task, bounded by the configured timeout.
    /// The task is aborted on timeout and when this future is dropped.
    async fn validate(&self, credential: ApiCredential) -> Result<(), CredentialError> {
        let validator = Arc::clone(&self.validator);
        let mut task = AbortOnDrop(tokio::spawn(async move {
            validator.validate(&credential).await
        }));

        match tokio::time::timeout(self.config.validation_timeout, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(CredentialError::Unknown(format!(
                "Validation task failed: {}",
                join_error
            ))),
            Err(_) => Err(CredentialError::CannotConnect(format!(
                "Validation timed out after {:?}",
                self.config.validation_timeout
            ))),
        }
    }

    fn show_form(errors: FormErrors) -> FlowResult {
        FlowResult::form(Self::STEP_USER, user_step_schema(), errors)
    }

    /// Options flow for an entry created by this integration.
    pub fn options_flow(&self, entry: &ConfigEntry) -> DeepSeekOptionsFlow {
        DeepSeekOptionsFlow::new(entry, Arc::clone(&self.registry), Arc::clone(&self.store))
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn submitted_api_key(input: &FormInput) -> Option<String> {
    input
        .get(CONF_API_KEY)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl FlowHandler for DeepSeekConfigFlow {
    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<FormInput>,
    ) -> FlowOutcome<FlowResult> {
        match step_id {
            Self::STEP_USER => self.step_user(user_input).await,
            other => Err(FlowError::UnknownStep(other.to_string())),
        }
    }
}
