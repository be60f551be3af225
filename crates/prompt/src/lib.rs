//! Prompt template for Docent.
//!
//! This crate provides the static question-answering template with:
//! - A built-in default definition
//! - YAML-based overrides
//! - Handlebars rendering of the `context` and `question` slots

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{load_prompt, load_prompt_file};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
