use std::time::Duration;

use bp_core::{AdvisorError, EngineConfig, PatientProfile, Suggestion, SuggestionSource};
use bp_engine::rank_suggestions;
use serde::{Deserialize, Serialize};

use crate::response::parse_suggestions;
use crate::LlmError;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "liquid/lfm-2.5-1.2b-instruct:free";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = "You are a clinical AI assistant specialized in hypertension management. Always return suggestions in JSON.";

/// Connection settings for the OpenRouter chat-completions API.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub app_name: String,
    pub site_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            app_name: "bp-advisor".to_string(),
            site_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmSettings {
    /// Read `OPENROUTER_API_KEY`, `OPENROUTER_MODEL` and `OPENROUTER_BASE_URL`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: var("OPENROUTER_API_KEY"),
            base_url: var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
            model: var("OPENROUTER_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }
}

/// OpenRouter-backed [`SuggestionSource`]. Disabled when no API key is set.
pub struct OpenRouterSource {
    settings: LlmSettings,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: String,
}

impl OpenRouterSource {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        Ok(Self {
            settings: LlmSettings {
                base_url: settings.base_url.trim_end_matches('/').to_string(),
                ..settings
            },
            client,
        })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmSettings::from_env())
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Ask the model for suggestions and normalize them into ranked [`Suggestion`]s.
    pub fn generate(&self, profile: &PatientProfile) -> Result<Vec<Suggestion>, LlmError> {
        let api_key = self.settings.api_key.as_deref().ok_or(LlmError::Disabled)?;
        let prompt = build_prompt(profile).map_err(|e| LlmError::Request(e.to_string()))?;

        let body = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.settings.base_url);
        let mut request = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("X-Title", &self.settings.app_name);
        if let Some(site_url) = &self.settings.site_url {
            request = request.header("HTTP-Referer", site_url);
        }

        tracing::info!(
            patient_id = %profile.patient_id,
            model = %self.settings.model,
            "Requesting LLM suggestions"
        );

        let response = request.json(&body).send().map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.settings.timeout_secs)
            } else {
                LlmError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "LLM API error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: status_message(status.as_u16(), &body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ResponseParsing("response contained no choices".into()))?;

        Ok(rank_suggestions(parse_suggestions(&content)?))
    }
}

impl SuggestionSource for OpenRouterSource {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn suggest(
        &self,
        profile: &PatientProfile,
        _config: &EngineConfig,
    ) -> Result<Vec<Suggestion>, AdvisorError> {
        Ok(self.generate(profile)?)
    }
}

fn status_message(status: u16, body: &str) -> String {
    match status {
        401 => "Unauthorized: invalid API key or user not found".to_string(),
        402 => "Insufficient balance in the OpenRouter account".to_string(),
        _ if body.trim().is_empty() => "request failed".to_string(),
        _ => body.trim().to_string(),
    }
}

/// Clinical prompt embedding the profile as JSON.
pub fn build_prompt(profile: &PatientProfile) -> Result<String, serde_json::Error> {
    let vitals = serde_json::to_string_pretty(&profile.vitals)?;
    let prescriptions = serde_json::to_string_pretty(&profile.prescriptions)?;
    let treatments = serde_json::to_string_pretty(&profile.treatments)?;
    let appointments = serde_json::to_string_pretty(&profile.appointments)?;

    Ok(format!(
        r#"Analyze the following patient data and provide actionable suggestions for hypertension management.

Patient ID: {patient_id}
As of: {as_of}

Vital readings (oldest to newest):
{vitals}

Prescriptions:
{prescriptions}

Treatments:
{treatments}

Appointments:
{appointments}

Analysis rule:
- If the patient has been on the SAME active medication for more than 8 weeks and recent readings are consistently at or above 140/90, include a suggestion for the clinician to consider titrating or changing medication, noting that the regimen has not reached target despite 8+ weeks of therapy.

Return a JSON object with a key "ai_suggestions" holding a list of objects, each with:
- "rule_id": a short identifier (e.g. "AI_001")
- "message": a concise clinical suggestion
- "evidence": the data points that led to it
- "severity": "low", "medium" or "high"
- "confidence": a number between 0.0 and 1.0
- "rationale": brief clinical reasoning

Only return the JSON object."#,
        patient_id = profile.patient_id,
        as_of = profile.as_of.to_rfc3339(),
    ))
}
