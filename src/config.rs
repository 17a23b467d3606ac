use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{
    constants::{DEFAULT_API_BASE, DEFAULT_VALIDATION_TIMEOUT_MS},
    error::{FlowError, FlowOutcome},
};

/// Settings for talking to the DeepSeek API during setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Upper bound for the credential check.
    #[serde(default = "default_validation_timeout", with = "duration_ms")]
    pub validation_timeout: Duration,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            validation_timeout: default_validation_timeout(),
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> FlowOutcome<T> {
    let file = File::open(path)
        .map_err(|e| FlowError::Config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| FlowError::Config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> FlowOutcome<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| FlowError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_validation_timeout() -> Duration {
    Duration::from_millis(DEFAULT_VALIDATION_TIMEOUT_MS)
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
