//! Prompt types for Docent.

use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM: &str = "You are a professional assistant. Your task is to answer questions using the provided context.
If the context does not contain the answer, try to answer the question yourself.

When answering, always cite the source (file name and page) if they are present in the context.

Context:
{{context}}";

const DEFAULT_USER: &str = "{{question}}";

/// A prompt definition, built in or loaded from YAML.
///
/// `system` and `user` are Handlebars templates. Only two variables are
/// ever supplied: `context` and `question`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// System message template
    pub system: String,

    /// User message template
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

impl Default for PromptDefinition {
    fn default() -> Self {
        Self {
            id: "docent.ask.default".to_string(),
            title: "Answer from retrieved excerpts".to_string(),
            system: DEFAULT_SYSTEM.to_string(),
            user: DEFAULT_USER.to_string(),
        }
    }
}

/// A fully rendered prompt ready for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message
    pub system: String,

    /// User message
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Length in characters of the substituted context block
    #[serde(rename = "contextChars")]
    pub context_chars: usize,
}
