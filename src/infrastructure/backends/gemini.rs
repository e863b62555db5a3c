//! Gemini `generateContent` adapter.

use serde::{Deserialize, Serialize};

use super::http;
use crate::{
    application::services::ModelBackend, domain::DomainError, settings::ProviderSettings,
};

const NAME: &str = "gemini";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Sends the system context as `systemInstruction`; the answer is every text part of the
/// first candidate, concatenated.
pub struct GeminiBackend {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl GeminiBackend {
    pub fn new(settings: &ProviderSettings, agent: ureq::Agent) -> Result<Self, DomainError> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            DomainError::unavailable(format!(
                "gemini needs an API key; set {}",
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

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim().trim_start_matches("models/");
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

fn extract_text(body: &str) -> Result<String, DomainError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| DomainError::response_shape(format!("gemini: {err}")))?;
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.is_empty() {
        return Err(DomainError::response_shape(
            "gemini: first candidate has no text parts",
        ));
    }
    Ok(text)
}

impl ModelBackend for GeminiBackend {
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

        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part {
                    text: system_context,
                }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part {
                    text: user_question,
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };
        let request = self
            .agent
            .post(&self.endpoint(model))
            .set("x-goog-api-key", &self.api_key);

        let raw = http::post_json(NAME, request, &body)?;
        Ok(http::text_or_fallback(NAME, &raw, extract_text))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn backend(base_url: &str) -> GeminiBackend {
        let settings = ProviderSettings {
            model: "gemini-2.5-flash".into(),
            base_url: base_url.into(),
            api_key_env: vec![],
            api_key: Some("g-test".into()),
        };
        GeminiBackend::new(&settings, http::agent(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_sends_system_instruction_and_joins_parts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "g-test")
            .match_body(Matcher::PartialJson(json!({
                "systemInstruction": {"parts": [{"text": "context blob"}]},
                "contents": [{"role": "user", "parts": [{"text": "question?"}]}],
                "generationConfig": {"temperature": 0.0}
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Ans"},{"text":"wer"}]}}]}"#,
            )
            .create();

        let text = backend(&server.url())
            .generate("context blob", "question?", "models/gemini-2.5-flash")
            .unwrap();

        assert_eq!(text, "Answer");
        mock.assert();
    }

    #[test]
    fn test_blocked_prompt_falls_back_to_raw_body() {
        let mut server = mockito::Server::new();
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_body(body)
            .create();

        let text = backend(&server.url())
            .generate("ctx", "q", "gemini-2.5-flash")
            .unwrap();
        assert_eq!(text, body);
    }

    #[test]
    fn test_non_json_success_body_is_returned_verbatim() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_body("plain text from a proxy")
            .create();

        let text = backend(&server.url())
            .generate("ctx", "q", "gemini-2.5-flash")
            .unwrap();
        assert_eq!(text, "plain text from a proxy");
    }
}
