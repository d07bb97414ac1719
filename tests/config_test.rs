// Config file loading and validation

#[cfg(test)]
mod config_tests {
    use std::fs;
    use webnav_lib::config::{load_config_from, save_config_to, validate_config, AppConfig};
    use webnav_lib::WebNavError;

    #[test]
    fn test_user_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
chrome_path = "/opt/chromium/chrome"

[browser]
headless = false
custom_args = ["--lang=en-US"]

[search]
engine_url = "https://duckduckgo.com"
query_selector = "input[name=\"q\"]"

[history]
max_entries = 0

[ai]
default_llm = "openai:gpt-4o-mini"

[ai.providers.openai]
name = "OpenAI"
api_type = "openai"
base_url = "https://api.openai.com/v1"
api_key = "sk-test"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.custom_args, vec!["--lang=en-US".to_string()]);
        assert_eq!(config.browser.startup_retries, 30);
        assert_eq!(config.search.engine_url, "https://duckduckgo.com");
        assert_eq!(config.search.result_limit, 5);
        assert_eq!(config.history.max_entries, 0);
        assert_eq!(config.timings.search_settle_ms, 3000);
        // a user providers table replaces the default one
        assert!(!config.ai.providers.contains_key("ollama"));
        assert_eq!(config.ai.providers["openai"].api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webnav").join("config.toml");

        let mut config = AppConfig::default();
        config.timings.element_wait_ms = 2500;
        config.search.result_limit = 8;
        save_config_to(&config, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_with_executable_chrome() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let chrome = dir.path().join("chrome");
        fs::write(&chrome, "#!/bin/sh\n").unwrap();

        let mut config = AppConfig::default();
        config.chrome_path = chrome.clone();

        fs::set_permissions(&chrome, fs::Permissions::from_mode(0o644)).unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, WebNavError::Validation(msg) if msg.contains("not executable")));

        fs::set_permissions(&chrome, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(validate_config(&config).is_ok());
    }
}
