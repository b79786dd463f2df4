//! The `{success, code, data, error}` wrapper every gateway response uses.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConsoleError, ConsoleResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    /// Collapses the envelope into `Ok(data)` or the server's error text.
    pub fn into_result<T: DeserializeOwned>(self) -> ConsoleResult<T> {
        if !self.success {
            let message = match (self.error, self.code) {
                (Some(error), _) if !error.is_empty() => error,
                (_, Some(code)) => format!("Request failed with code {}", code),
                _ => "Request failed".to_string(),
            };
            return Err(ConsoleError::ApiError(message));
        }

        serde_json::from_value(self.data).map_err(|e| {
            ConsoleError::ApiError(format!("Unexpected response payload: {}", e))
        })
    }
}
