//! Prompt builder for rendering templates and injecting context.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use docent_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition, an assembled context block and the question.
///
/// The context block and the question are the only values substituted; the
/// template text itself is static.
///
/// # Example
/// ```
/// use docent_prompt::{build_prompt, PromptDefinition};
///
/// let built = build_prompt(&PromptDefinition::default(), "\n--- Excerpt 1 ---\n", "What is Rust?").unwrap();
/// assert_eq!(built.user, "What is Rust?");
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    context: &str,
    question: &str,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut variables = HashMap::new();
    variables.insert("context", context);
    variables.insert("question", question);

    let system = render_template(&definition.system, &variables)?;
    let user = render_template(&definition.user, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            context_chars: context.chars().count(),
        },
    })
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(
    template: &str,
    variables: &HashMap<&str, &str>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
