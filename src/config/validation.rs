use crate::config::schema::{AIConfig, ApiType, AppConfig, SearchSettings};
use crate::error::{Result, WebNavError};
use std::path::Path;

/// Validate Chrome executable path
pub fn validate_chrome_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(WebNavError::Validation(format!(
            "Chrome executable not found at {:?}",
            path
        )));
    }

    if !path.is_file() {
        return Err(WebNavError::Validation(format!(
            "Chrome path {:?} is not a file",
            path
        )));
    }

    // On Unix systems, check if executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = path.metadata().map_err(|e| {
            WebNavError::Validation(format!("Cannot read Chrome file metadata: {}", e))
        })?;
        let permissions = metadata.permissions();
        if permissions.mode() & 0o111 == 0 {
            return Err(WebNavError::Validation(format!(
                "Chrome executable {:?} is not executable",
                path
            )));
        }
    }

    Ok(())
}

/// Validate the AI section: `default_llm` must name a configured provider
pub fn validate_ai_config(ai: &AIConfig) -> Result<()> {
    let selection = ai.default_llm.as_deref().ok_or_else(|| {
        WebNavError::Validation("No default LLM configured (ai.default_llm)".to_string())
    })?;

    let (provider_id, model) = selection.split_once(':').ok_or_else(|| {
        WebNavError::Validation(format!(
            "Invalid default_llm format '{}'. Expected 'provider_id:model_name'",
            selection
        ))
    })?;

    if model.trim().is_empty() {
        return Err(WebNavError::Validation(format!(
            "default_llm '{}' has an empty model name",
            selection
        )));
    }

    let provider = ai.providers.get(provider_id).ok_or_else(|| {
        WebNavError::Validation(format!("Provider '{}' not configured", provider_id))
    })?;

    if provider.base_url.trim().is_empty() {
        return Err(WebNavError::Validation(format!(
            "Provider '{}' has an empty base_url",
            provider_id
        )));
    }

    if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
        return Err(WebNavError::Validation(format!(
            "Invalid base_url for provider '{}': {}. Must start with http:// or https://",
            provider_id, provider.base_url
        )));
    }

    if provider.api_type == ApiType::Anthropic && provider.api_key.is_none() {
        return Err(WebNavError::Validation(format!(
            "Provider '{}' uses the Anthropic API and needs an api_key",
            provider_id
        )));
    }

    Ok(())
}

/// Validate search flow settings
pub fn validate_search(search: &SearchSettings) -> Result<()> {
    if search.engine_url.trim().is_empty() {
        return Err(WebNavError::Validation(
            "Search engine URL cannot be empty".to_string(),
        ));
    }

    if search.query_selector.trim().is_empty() {
        return Err(WebNavError::Validation(
            "Search query selector cannot be empty".to_string(),
        ));
    }

    if search.result_selectors.iter().all(|s| s.trim().is_empty()) {
        return Err(WebNavError::Validation(
            "At least one result selector is required".to_string(),
        ));
    }

    if search.result_limit == 0 {
        return Err(WebNavError::Validation(
            "Result limit must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validate everything needed to run tasks
pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_chrome_path(&config.chrome_path)?;
    validate_ai_config(&config.ai)?;
    validate_search(&config.search)?;
    Ok(())
}
