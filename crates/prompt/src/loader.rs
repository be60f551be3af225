//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use docent_core::{AppError, AppResult};
use std::path::Path;

/// Resolve the prompt to use: the YAML file when one is configured,
/// otherwise the built-in definition.
///
/// # Example
/// ```no_run
/// use docent_prompt::load_prompt;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(None)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(file: Option<&Path>) -> AppResult<PromptDefinition> {
    match file {
        Some(path) => load_prompt_file(path),
        None => Ok(PromptDefinition::default()),
    }
}

/// Load and validate a prompt definition from a YAML file.
pub fn load_prompt_file(prompt_file: &Path) -> AppResult<PromptDefinition> {
    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt system template cannot be empty".to_string(),
        ));
    }

    if !def.system.contains("{{context}}") && !def.user.contains("{{context}}") {
        return Err(AppError::Prompt(format!(
            "Prompt {} never uses {{{{context}}}}",
            def.id
        )));
    }

    if !def.user.contains("{{question}}") && !def.system.contains("{{question}}") {
        return Err(AppError::Prompt(format!(
            "Prompt {} never uses {{{{question}}}}",
            def.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, name: &str, content: &str) -> PathBuf {
        let file_path = dir.join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_load_default_when_unset() {
        let prompt = load_prompt(None).unwrap();
        assert_eq!(prompt, PromptDefinition::default());
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(
            temp_dir.path(),
            "ask.yml",
            "id: test.prompt\ntitle: Test Prompt\nsystem: \"Context: {{context}}\"\nuser: \"Q: {{question}}\"\n",
        );

        let prompt = load_prompt(Some(&path)).unwrap();
        assert_eq!(prompt.id, "test.prompt");
        assert_eq!(prompt.title, "Test Prompt");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt_file(&temp_dir.path().join("missing.yml"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(temp_dir.path(), "bad.yml", "invalid: yaml: content:");
        assert!(load_prompt_file(&path).is_err());
    }

    #[test]
    fn test_prompt_without_context_slot_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(
            temp_dir.path(),
            "noctx.yml",
            "id: noctx\nsystem: \"Be nice\"\n",
        );
        assert!(load_prompt_file(&path).is_err());
    }
}
