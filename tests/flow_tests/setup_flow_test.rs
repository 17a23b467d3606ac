use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use deepseek_conversation::{
    config::IntegrationConfig,
    constants::{DEFAULT_INSTRUCTIONS_PROMPT, DOMAIN},
    flow::{DeepSeekConfigFlow, FlowResult},
    host::{EntryStore, InMemoryEntryStore, StaticLlmApiRegistry},
    options::ConversationOptions,
    validation::{ApiCredential, CredentialError, CredentialValidator, MockCredentialValidator},
};
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use serde_json::json;
use tokio::sync::oneshot;

use super::{form, LogCapture};

fn setup_flow(
    validator: impl CredentialValidator + 'static,
    store: &InMemoryEntryStore,
) -> DeepSeekConfigFlow {
    DeepSeekConfigFlow::new(
        IntegrationConfig::default(),
        Arc::new(validator),
        Arc::new(store.clone()),
        Arc::new(StaticLlmApiRegistry::assist_only()),
    )
}

fn failing_validator(error: CredentialError) -> MockCredentialValidator {
    let mut validator = MockCredentialValidator::new();
    validator
        .expect_validate()
        .times(1)
        .returning(move |_| Err(error.clone()));
    validator
}

struct SlowValidator;

#[async_trait]
impl CredentialValidator for SlowValidator {
    async fn validate(&self, _credential: &ApiCredential) -> Result<(), CredentialError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

struct PanickingValidator;

#[async_trait]
impl CredentialValidator for PanickingValidator {
    async fn validate(&self, _credential: &ApiCredential) -> Result<(), CredentialError> {
        panic!("validator blew up");
    }
}

/// Holds `alive` for as long as its validation runs.
struct HangingValidator {
    alive: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl CredentialValidator for HangingValidator {
    async fn validate(&self, _credential: &ApiCredential) -> Result<(), CredentialError> {
        let _alive = self.alive.lock().unwrap().take();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_initial_form_without_input() {
    let mut validator = MockCredentialValidator::new();
    validator.expect_validate().never();
    let store = InMemoryEntryStore::new();

    let mut flow = setup_flow(validator, &store);
    let result = flow.step_user(None).await.unwrap();

    let FlowResult::Form {
        step_id,
        data_schema,
        errors,
    } = result
    else {
        panic!("expected a form");
    };
    assert_eq!(step_id, "user");
    assert_eq!(data_schema.keys(), vec!["api_key"]);
    assert!(errors.is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_missing_credential_field_is_not_validated() {
    let mut validator = MockCredentialValidator::new();
    validator.expect_validate().never();
    let store = InMemoryEntryStore::new();

    let mut flow = setup_flow(validator, &store);
    let result = flow
        .step_user(form(json!({"prompt": "hello"})))
        .await
        .unwrap();

    assert!(result.is_form());
    assert_eq!(result.base_error(), None);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_connection_failure() {
    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(
        failing_validator(CredentialError::CannotConnect("connection refused".into())),
        &store,
    );

    let result = flow
        .step_user(form(json!({"api_key": "sk-test"})))
        .await
        .unwrap();

    assert_eq!(result.base_error(), Some("cannot_connect"));
    assert_eq!(result.schema().unwrap().keys(), vec!["api_key"]);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_authentication_failure() {
    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(
        failing_validator(CredentialError::InvalidAuth("Authentication Fails".into())),
        &store,
    );

    let result = flow
        .step_user(form(json!({"api_key": "sk-wrong"})))
        .await
        .unwrap();

    assert_eq!(result.base_error(), Some("invalid_auth"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unexpected_failure_is_logged() {
    let capture = LogCapture::default();
    let _guard = capture.install();

    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(
        failing_validator(CredentialError::Unknown("Insufficient Balance".into())),
        &store,
    );

    let result = flow
        .step_user(form(json!({"api_key": "sk-test"})))
        .await
        .unwrap();

    assert_eq!(result.base_error(), Some("unknown"));
    assert!(store.is_empty());

    let logs = capture.contents();
    assert!(logs.contains("ERROR"), "logs: {}", logs);
    assert!(logs.contains("Unexpected exception"), "logs: {}", logs);
    assert!(logs.contains("Insufficient Balance"), "logs: {}", logs);
    assert!(!logs.contains("sk-test"), "logs: {}", logs);
}

#[tokio::test]
async fn test_expected_failures_are_not_logged_as_errors() {
    let capture = LogCapture::default();
    let _guard = capture.install();

    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(
        failing_validator(CredentialError::InvalidAuth("bad key".into())),
        &store,
    );
    flow.step_user(form(json!({"api_key": "sk-test"})))
        .await
        .unwrap();

    assert!(!capture.contents().contains("ERROR"));
}

#[tokio::test]
async fn test_successful_setup_creates_entry() {
    let mut validator = MockCredentialValidator::new();
    validator
        .expect_validate()
        .withf(|credential| credential.api_key.expose_secret() == "sk-good")
        .times(1)
        .returning(|_| Ok(()));
    let store = InMemoryEntryStore::new();

    let mut flow = setup_flow(validator, &store);
    let result = flow
        .step_user(form(json!({
            "api_key": "sk-good",
            "prompt": "ignored",
            "recommended": false,
        })))
        .await
        .unwrap();

    let FlowResult::CreateEntry { title, entry_id } = result else {
        panic!("expected an entry to be created");
    };
    assert_eq!(title, "DeepSeek");

    let entry = store.get_entry(&entry_id).await.unwrap().unwrap();
    assert_eq!(entry.title, "DeepSeek");
    assert_eq!(entry.domain, DOMAIN);
    assert_eq!(entry.version, 1);
    assert_eq!(entry.data.api_key, "sk-good");
    assert_eq!(entry.options, ConversationOptions::recommended());
    assert_eq!(
        serde_json::to_value(&entry.options).unwrap(),
        json!({
            "recommended": true,
            "llm_hass_api": "assist",
            "prompt": DEFAULT_INSTRUCTIONS_PROMPT,
        })
    );
}

#[tokio::test]
async fn test_resubmission_after_failure() {
    let mut validator = MockCredentialValidator::new();
    validator
        .expect_validate()
        .withf(|credential| credential.api_key.expose_secret() == "sk-wrong")
        .times(1)
        .returning(|_| Err(CredentialError::InvalidAuth("bad key".into())));
    validator
        .expect_validate()
        .withf(|credential| credential.api_key.expose_secret() == "sk-good")
        .times(1)
        .returning(|_| Ok(()));
    let store = InMemoryEntryStore::new();

    let mut flow = setup_flow(validator, &store);
    let first = flow
        .step_user(form(json!({"api_key": "sk-wrong"})))
        .await
        .unwrap();
    assert_eq!(first.base_error(), Some("invalid_auth"));

    let second = flow
        .step_user(form(json!({"api_key": "sk-good"})))
        .await
        .unwrap();
    assert!(!second.is_form());
    assert_eq!(store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_validation_timeout_cannot_connect() {
    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(SlowValidator, &store);

    let result = flow
        .step_user(form(json!({"api_key": "sk-test"})))
        .await
        .unwrap();

    assert_eq!(result.base_error(), Some("cannot_connect"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_panicking_validator_is_unknown() {
    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(PanickingValidator, &store);

    let result = flow
        .step_user(form(json!({"api_key": "sk-test"})))
        .await
        .unwrap();

    assert_eq!(result.base_error(), Some("unknown"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_options_flow_from_created_entry() {
    let mut validator = MockCredentialValidator::new();
    validator.expect_validate().returning(|_| Ok(()));
    let store = InMemoryEntryStore::new();

    let mut flow = setup_flow(validator, &store);
    let FlowResult::CreateEntry { entry_id, .. } = flow
        .step_user(form(json!({"api_key": "sk-good"})))
        .await
        .unwrap()
    else {
        panic!("expected an entry to be created");
    };
    let entry = store.get_entry(&entry_id).await.unwrap().unwrap();

    let mut options_flow = flow.options_flow(&entry);
    assert!(options_flow.last_rendered_recommended());

    let result = options_flow
        .step_init(form(json!({
            "recommended": true,
            "prompt": "Answer like a butler.",
            "llm_hass_api": "none",
        })))
        .await
        .unwrap();
    assert!(!result.is_form());

    let entry = store.get_entry(&entry_id).await.unwrap().unwrap();
    assert_eq!(entry.options.base().prompt, "Answer like a butler.");
    assert_eq!(entry.options.base().llm_hass_api, None);
    assert_eq!(entry.data.api_key, "sk-good");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_step_stops_validation() {
    let (alive, stopped) = oneshot::channel();
    let validator = HangingValidator {
        alive: Mutex::new(Some(alive)),
    };
    let store = InMemoryEntryStore::new();
    let mut flow = setup_flow(validator, &store);

    let step = tokio::time::timeout(
        Duration::from_millis(100),
        flow.step_user(form(json!({"api_key": "sk-test"}))),
    )
    .await;
    assert!(step.is_err());

    // the validation task is aborted long before the configured timeout
    let dropped = tokio::time::timeout(Duration::from_secs(1), stopped).await;
    assert!(matches!(dropped, Ok(Err(_))));
    assert!(store.is_empty());
}
