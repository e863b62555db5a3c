//! OpenAI Chat Completions adapter.

use serde::{Deserialize, Serialize};

use super::http;
use crate::{
    application::services::ModelBackend, domain::DomainError, settings::ProviderSettings,
};

const NAME: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    n: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    /// Null for refusals and tool calls.
    #[serde(default)]
    content: Option<String>,
}

/// Sends the system context as a `system` chat message at temperature 0.
pub struct OpenAiBackend {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl OpenAiBackend {
    pub fn new(settings: &ProviderSettings, agent: ureq::Agent) -> Result<Self, DomainError> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            DomainError::unavailable(format!(
                "openai needs an API key; set {}",
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
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|err| DomainError::response_shape(format!("openai: {err}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| DomainError::response_shape("openai: first choice has no content"))
}

impl ModelBackend for OpenAiBackend {
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

        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_context,
                },
                ChatMessage {
                    role: "user",
                    content: user_question,
                },
            ],
            temperature: 0.0,
            n: 1,
        };
        let request = self
            .agent
            .post(&format!("{}/v1/chat/completions", self.base_url))
            .set("Authorization", &format!("Bearer {}", self.api_key));

        let raw = http::post_json(NAME, request, &body)?;
        Ok(http::text_or_fallback(NAME, &raw, extract_text))
    }
}
