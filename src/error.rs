use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::StoreError;
use crate::validation::CredentialError;

/// Errors that escape a flow step and reach the host.
///
/// Problems with user input are never reported here; they are rendered back
/// into the form as error tags instead.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Entry store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type FlowOutcome<T> = Result<T, FlowError>;

/// Form-level error tag shown under the `base` key of a rendered form.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BaseError {
    CannotConnect,
    InvalidAuth,
    Unknown,
}

impl From<&CredentialError> for BaseError {
    fn from(error: &CredentialError) -> Self {
        match error {
            CredentialError::CannotConnect(_) => BaseError::CannotConnect,
            CredentialError::InvalidAuth(_) => BaseError::InvalidAuth,
            CredentialError::Unknown(_) => BaseError::Unknown,
        }
    }
}

/// Field-level error tag produced when a submitted option fails validation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldError {
    Required,
    InvalidType,
    OutOfRange,
}
