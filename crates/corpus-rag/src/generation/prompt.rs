//! Prompt templates for grounded, domain-scoped answers

use crate::config::PromptConfig;
use crate::error::{Error, Result};
use crate::types::ScoredUnit;

/// Default template; `{domain}` and `{refusal}` are filled from config
pub const DEFAULT_TEMPLATE: &str = r#"Using the information contained in the context, give a short and concise answer to the question.
Do not answer any questions not related to {domain}; reply with "{refusal}".
If the question is not related to {domain}, ignore all the context and end the chat.

Context:
{context}

Question: {query}
Answer:"#;

/// Renders retrieved units and a question into a generation prompt
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            template: fill(
                DEFAULT_TEMPLATE,
                &[
                    ("{domain}", "edge AI"),
                    ("{refusal}", "I only answer Edge AI questions"),
                ],
            ),
        }
    }
}

impl PromptAssembler {
    /// Build from config; a custom template must contain `{query}`
    pub fn new(config: &PromptConfig) -> Result<Self> {
        let raw = config.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        if !raw.contains("{query}") {
            return Err(Error::config("Prompt template must contain a {query} placeholder"));
        }

        Ok(Self {
            template: fill(
                raw,
                &[
                    ("{domain}", config.domain.as_str()),
                    ("{refusal}", config.refusal.as_str()),
                ],
            ),
        })
    }

    /// Context block: one `"{text} URL:{source}"` line per unit, in retrieval order
    pub fn build_context(units: &[ScoredUnit]) -> String {
        units
            .iter()
            .map(|scored| {
                format!(
                    "{} URL:{}",
                    scored.unit.text.trim(),
                    scored.unit.meta.provenance()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the full prompt
    pub fn render(&self, query: &str, units: &[ScoredUnit]) -> String {
        let context = Self::build_context(units);
        fill(
            &self.template,
            &[("{context}", context.as_str()), ("{query}", query)],
        )
    }
}

/// Single-pass placeholder substitution; inserted values are never rescanned
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
        for (placeholder, value) in values {
            if let Some(after) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
