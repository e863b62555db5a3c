//! Context assembly: joining retrieved documents and filling the prompt template.

use tracing::warn;

use crate::domain::{DomainError, ReviewMatch};

/// Placeholder the retrieved context is substituted into.
pub const SLOT: &str = "{}";

/// System instruction used for both analysis branches.
pub const DEFAULT_TEMPLATE: &str = "You are a customer success employee at a large car \
dealership. Use the following car reviews to answer questions: {}";

/// A prompt template validated to contain exactly one [`SLOT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    prefix: String,
    suffix: String,
}

impl PromptTemplate {
    pub fn parse(template: &str) -> Result<Self, DomainError> {
        match template.matches(SLOT).count() {
            1 => {}
            0 => {
                return Err(DomainError::template(
                    "template has no `{}` slot for the review context",
                ))
            }
            n => {
                return Err(DomainError::template(format!(
                    "template has {n} `{{}}` slots, expected exactly one"
                )))
            }
        }

        let (prefix, suffix) = template
            .split_once(SLOT)
            .ok_or_else(|| DomainError::template("template slot disappeared while splitting"))?;

        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Single-pass substitution; slot syntax inside `context` is left as-is.
    pub fn render(&self, context: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + context.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(context);
        out.push_str(&self.suffix);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_TEMPLATE.trim_end_matches(SLOT).to_string(),
            suffix: String::new(),
        }
    }
}

pub fn render_prompt(template: &str, context: &str) -> Result<String, DomainError> {
    Ok(PromptTemplate::parse(template)?.render(context))
}

/// Concatenates document texts, most relevant first.
///
/// Logs a warning when `separator` occurs inside a document, since the model
/// can no longer tell where one review ends and the next begins.
pub fn join_documents(docs: &[ReviewMatch], separator: &str) -> String {
    if !separator.is_empty() && docs.len() > 1 {
        let ambiguous = docs.iter().filter(|d| d.text.contains(separator)).count();
        if ambiguous > 0 {
            warn!(
                target: "review_lens::prompt",
                separator,
                ambiguous,
                "separator appears inside review text; document boundaries are ambiguous"
            );
        }
    }

    docs.iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
