//! AI editor actions — kinds, prompt templates and markup stripping.
//!
//! Each [`ActionKind`] maps to one completion endpoint and one fixed
//! instruction template. Only [`ActionKind::Generate`] cleans its input
//! (the editor hands it a topic line wrapped in HTML); the other kinds embed
//! the draft verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while turning editor input into a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("No text provided")]
    EmptyInput,

    #[error("Unknown action kind: {0}")]
    UnknownKind(String),
}

/// The four AI-assisted text transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Rephrase,
    Summarize,
    Spellcheck,
    Generate,
}

impl ActionKind {
    /// Every kind, in the order the editor toolbar lists them.
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Rephrase,
        ActionKind::Summarize,
        ActionKind::Spellcheck,
        ActionKind::Generate,
    ];

    /// HTTP route of the completion endpoint serving this kind.
    pub const fn path(self) -> &'static str {
        match self {
            ActionKind::Rephrase => "/api/rephrase",
            ActionKind::Summarize => "/api/summarize",
            ActionKind::Spellcheck => "/api/spellchecker",
            ActionKind::Generate => "/api/generateBlog",
        }
    }

    /// Notification shown once a completion has replaced the draft.
    pub const fn success_message(self) -> &'static str {
        match self {
            ActionKind::Rephrase => "Blog content rephrased successfully",
            ActionKind::Summarize => "Blog content summarized successfully",
            ActionKind::Spellcheck => "Spelling corrected successfully",
            ActionKind::Generate => "Blog generated successfully",
        }
    }

    /// Build the upstream prompt for `source_text`.
    ///
    /// `Generate` strips markup first and rejects input that is empty
    /// afterwards; the other kinds accept any text.
    pub fn build_prompt(self, source_text: &str) -> Result<String, ActionError> {
        let prompt = match self {
            ActionKind::Rephrase => format!(
                "Please rephrase the following text in a different way, maintaining the original meaning: \"{source_text}\""
            ),
            ActionKind::Summarize => format!(
                "Please summarize the following text, maintaining the original meaning: \"{source_text}\""
            ),
            ActionKind::Spellcheck => format!(
                "Please correct the spelling and grammar of the following text, returning only the corrected text and maintaining the original meaning: \"{source_text}\""
            ),
            ActionKind::Generate => {
                let topic = strip_markup(source_text);
                if topic.is_empty() {
                    return Err(ActionError::EmptyInput);
                }
                format!(
                    "Please generate a proper professional blog with introduction, body, conclusion on this topic with this many words written beside the topic name: \"{topic}\""
                )
            }
        };
        Ok(prompt)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Rephrase => "rephrase",
            ActionKind::Summarize => "summarize",
            ActionKind::Spellcheck => "spellcheck",
            ActionKind::Generate => "generate",
        };
        f.write_str(name)
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    /// Accepts the canonical names plus the editor's legacy aliases
    /// (`paraphrase`, `generateBlog`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rephrase" | "paraphrase" => Ok(ActionKind::Rephrase),
            "summarize" => Ok(ActionKind::Summarize),
            "spellcheck" | "spellchecker" => Ok(ActionKind::Spellcheck),
            "generate" | "generateblog" => Ok(ActionKind::Generate),
            _ => Err(ActionError::UnknownKind(s.to_string())),
        }
    }
}

/// One dispatched AI action: what to do, and to which text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub source_text: String,
}

impl ActionRequest {
    pub fn new(kind: ActionKind, source_text: impl Into<String>) -> Self {
        Self {
            kind,
            source_text: source_text.into(),
        }
    }
}

/// Remove markup tags and normalise whitespace.
///
/// Every `<...>` tag becomes a single space, runs of whitespace collapse to
/// one space, and the result is trimmed. A `<` with no closing `>` after it
/// is kept as text.
pub fn strip_markup(html: &str) -> String {
    let mut without_tags = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        without_tags.push_str(&rest[..open]);
        without_tags.push(' ');
        rest = &rest[open + close + 1..];
    }
    without_tags.push_str(rest);
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}
