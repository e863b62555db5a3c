//! Anthropic Messages API adapter.

use serde::{Deserialize, Serialize};

use super::http;
use crate::{
    application::services::ModelBackend, domain::DomainError, settings::ProviderSettings,
};

const NAME: &str = "claude";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// The system context goes in the dedicated `system` field; the answer is the text of
/// the first content block.
pub struct ClaudeBackend {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl ClaudeBackend {
    pub fn new(settings: &ProviderSettings, agent: ureq::Agent) -> Result<Self, DomainError> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            DomainError::unavailable(format!(
                "claude needs an API key; set {}",
                settings.api_key_env.join(" or ")
            ))
        })?;

        Ok(Self {
            agent,
            base_url: settings.base_url().to_string(),
            api_key,
            default_model: settings.model.clone(),
        })
    }
}

fn extract_text(body: &str) -> Result<String, DomainError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|err| DomainError::response_shape(format!("claude: {err}")))?;
    response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| DomainError::response_shape("claude: first content block has no text"))
}

impl ModelBackend for ClaudeBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn generate(
        &self,
        system_context: &str,
        user_question: &str,
        model: &str,
    ) -> Result<String, DomainError> {
        http::validate_inputs(system_context, user_question, model)?;

        let body = MessagesRequest {
            model,
            system: system_context,
            max_tokens: MAX_TOKENS,
            messages: [Message {
                role: "user",
                content: user_question,
            }],
        };
        let request = self
            .agent
            .post(&format!("{}/v1/messages", self.base_url))
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", API_VERSION);

        let raw = http::post_json(NAME, request, &body)?;
        Ok(http::text_or_fallback(NAME, &raw, extract_text))
    }
}
