//! Optional LLM-backed suggestion source.
//!
//! This path does network I/O and has no deterministic contract. Callers wrap
//! it in [`FallbackSource`] so a failure degrades to the rule engine instead of
//! surfacing to the clinician.

pub mod openrouter;
pub mod response;

use bp_core::{AdvisorError, EngineConfig, PatientProfile, Suggestion, SuggestionSource};

pub use openrouter::{LlmSettings, OpenRouterSource};
pub use response::parse_suggestions;

/// Failures at the LLM collaborator boundary.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM source disabled: no API key configured")]
    Disabled,
    #[error("Could not build request: {0}")]
    Request(String),
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("LLM API error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Could not parse response: {0}")]
    ResponseParsing(String),
}

impl From<LlmError> for AdvisorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ResponseParsing(message) => AdvisorError::Parse(message),
            other => AdvisorError::Unavailable(other.to_string()),
        }
    }
}

/// Try `primary`; on any error log it and answer from `fallback`.
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> SuggestionSource for FallbackSource<P, F>
where
    P: SuggestionSource,
    F: SuggestionSource,
{
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn suggest(
        &self,
        profile: &PatientProfile,
        config: &EngineConfig,
    ) -> Result<Vec<Suggestion>, AdvisorError> {
        match self.primary.suggest(profile, config) {
            Ok(suggestions) => Ok(suggestions),
            Err(err) => {
                tracing::warn!(
                    source = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "Suggestion source failed, falling back"
                );
                self.fallback.suggest(profile, config)
            }
        }
    }
}
