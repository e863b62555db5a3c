//! Model provider adapters.
//!
//! Each provider is compiled in behind a cargo feature of the same name. The
//! factory resolves a backend once at startup and fails before any network
//! traffic when the provider is unknown, compiled out, or has no credentials.

pub mod http;

#[cfg(feature = "claude")]
mod claude;
#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "claude")]
pub use claude::ClaudeBackend;
#[cfg(feature = "gemini")]
pub use gemini::GeminiBackend;
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::{
    application::services::ModelBackend,
    domain::DomainError,
    settings::{ProviderSettings, ProvidersConfig},
};

/// Closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum BackendKind {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "gemini")]
    Gemini,
    #[value(name = "claude")]
    Claude,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::OpenAi,
        BackendKind::Gemini,
        BackendKind::Claude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
            BackendKind::Claude => "claude",
        }
    }

    pub fn is_compiled_in(&self) -> bool {
        match self {
            BackendKind::OpenAi => cfg!(feature = "openai"),
            BackendKind::Gemini => cfg!(feature = "gemini"),
            BackendKind::Claude => cfg!(feature = "claude"),
        }
    }

    fn settings<'a>(&self, providers: &'a ProvidersConfig) -> &'a ProviderSettings {
        match self {
            BackendKind::OpenAi => &providers.openai,
            BackendKind::Gemini => &providers.gemini,
            BackendKind::Claude => &providers.claude,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                DomainError::config(format!(
                    "unknown backend `{wanted}`; choose one of openai|gemini|claude"
                ))
            })
    }
}

/// Resolves a backend by identifier. Unknown identifiers are a `Config` error.
pub fn select_backend(
    id: &str,
    providers: &ProvidersConfig,
    timeout: Duration,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    let kind = BackendKind::from_str(id)?;
    build_backend(kind, providers, timeout)
}

pub fn build_backend(
    kind: BackendKind,
    providers: &ProvidersConfig,
    timeout: Duration,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    if !kind.is_compiled_in() {
        return Err(DomainError::unavailable(format!(
            "{kind} support is not compiled in; rebuild with `--features {kind}`"
        )));
    }

    let settings = kind.settings(providers);
    let agent = http::agent(timeout);
    let backend = match kind {
        BackendKind::OpenAi => openai_backend(settings, agent)?,
        BackendKind::Gemini => gemini_backend(settings, agent)?,
        BackendKind::Claude => claude_backend(settings, agent)?,
    };

    info!(
        target: "review_lens::backend",
        backend = %kind,
        model = backend.default_model(),
        "model backend ready"
    );
    Ok(backend)
}

#[cfg(feature = "openai")]
fn openai_backend(
    settings: &ProviderSettings,
    agent: ureq::Agent,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    Ok(Box::new(OpenAiBackend::new(settings, agent)?))
}

#[cfg(not(feature = "openai"))]
fn openai_backend(
    _settings: &ProviderSettings,
    _agent: ureq::Agent,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    Err(DomainError::unavailable("openai support is not compiled in"))
}

#[cfg(feature = "gemini")]
fn gemini_backend(
    settings: &ProviderSettings,
    agent: ureq::Agent,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    Ok(Box::new(GeminiBackend::new(settings, agent)?))
}

#[cfg(not(feature = "gemini"))]
fn gemini_backend(
    _settings: &ProviderSettings,
    _agent: ureq::Agent,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    Err(DomainError::unavailable("gemini support is not compiled in"))
}

#[cfg(feature = "claude")]
fn claude_backend(
    settings: &ProviderSettings,
    agent: ureq::Agent,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    Ok(Box::new(ClaudeBackend::new(settings, agent)?))
}

#[cfg(not(feature = "claude"))]
fn claude_backend(
    _settings: &ProviderSettings,
    _agent: ureq::Agent,
) -> Result<Box<dyn ModelBackend>, DomainError> {
    Err(DomainError::unavailable("claude support is not compiled in"))
}
