//! External collaborators used by the session.
//!
//! The session only depends on the [`CopyGenerator`] trait; the Gemini
//! client is the production implementation.

pub mod gemini;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{GeneratedMessages, RestaurantConfig};

pub use gemini::GeminiGenerator;

/// Credential for the generation service.
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps `key`, or returns `None` if it is blank.
    #[must_use]
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// Returns the raw key for use in a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Failure of a generation request. The message is shown to the user verbatim.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request never produced a response (network, DNS, timeout).
    #[error("Could not reach the generation service: {0}")]
    Http(String),
    /// The service answered with an error status.
    #[error("Generation service error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },
    /// The service answered but the content was not three messages.
    #[error("Unexpected response from the generation service: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Turns a restaurant description into the three WhatsApp templates.
#[async_trait]
pub trait CopyGenerator: Send + Sync {
    /// Generates the templates for `config`, authenticating with `api_key`.
    async fn generate_copy(
        &self,
        api_key: &ApiKey,
        config: &RestaurantConfig,
    ) -> Result<GeneratedMessages, GenerationError>;
}
