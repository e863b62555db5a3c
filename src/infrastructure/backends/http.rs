//! Blocking HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Error envelope shared by the OpenAI, Anthropic and Gemini APIs.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// Rejects inputs no provider would accept, before any network traffic.
pub fn validate_inputs(
    system_context: &str,
    user_question: &str,
    model: &str,
) -> Result<(), DomainError> {
    if system_context.trim().is_empty() {
        return Err(DomainError::validation("system context cannot be empty"));
    }
    if user_question.trim().is_empty() {
        return Err(DomainError::validation("user question cannot be empty"));
    }
    if model.trim().is_empty() {
        return Err(DomainError::config("model identifier cannot be empty"));
    }
    Ok(())
}

/// Sends `body` as JSON and returns the raw response text of a 2xx reply.
pub fn post_json(
    provider: &str,
    request: ureq::Request,
    body: &impl Serialize,
) -> Result<String, DomainError> {
    debug!(target: "review_lens::backend", provider, url = request.url(), "sending request");

    let response = request
        .send_json(body)
        .map_err(|err| handle_http_error(provider, err))?;

    response.into_string().map_err(|err| {
        DomainError::request(format!("{provider}: failed to read response body: {err}"))
    })
}

/// Convert ureq errors to request errors, surfacing the provider's message when present.
pub fn handle_http_error(provider: &str, error: ureq::Error) -> DomainError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => DomainError::request(format!(
                    "{provider} returned HTTP {code}: {}",
                    parsed.error.message
                )),
                Err(_) if body.trim().is_empty() => {
                    DomainError::request(format!("{provider} returned HTTP {code}"))
                }
                Err(_) => DomainError::request(format!("{provider} returned HTTP {code}: {body}")),
            }
        }
        ureq::Error::Transport(transport) => {
            DomainError::request(format!("{provider} transport error: {transport}"))
        }
    }
}

/// Applies `extract` to the body, falling back to the raw body when no text can be found.
pub fn text_or_fallback(
    provider: &str,
    body: &str,
    extract: impl FnOnce(&str) -> Result<String, DomainError>,
) -> String {
    match extract(body) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                target: "review_lens::backend",
                provider,
                error = %err,
                "falling back to raw response body"
            );
            body.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_inputs() {
        assert!(validate_inputs("ctx", "question", "model").is_ok());
        assert!(matches!(
            validate_inputs(" ", "question", "model"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_inputs("ctx", "", "model"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_inputs("ctx", "question", ""),
            Err(DomainError::Config(_))
        ));
    }

    #[test]
    fn test_fallback_returns_raw_body() {
        let text = text_or_fallback("test", r#"{"unexpected":true}"#, |_| {
            Err(DomainError::response_shape("missing text"))
        });
        assert_eq!(text, r#"{"unexpected":true}"#);

        let text = text_or_fallback("test", "{}", |_| Ok("extracted".into()));
        assert_eq!(text, "extracted");
    }
}
