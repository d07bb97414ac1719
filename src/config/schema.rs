use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Chrome executable path
    #[serde(default = "AppConfig::default_chrome_path")]
    pub chrome_path: PathBuf,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Search engine flow used by the shopping/search/question handlers
    #[serde(default)]
    pub search: SearchSettings,

    /// Fixed waits and pauses
    #[serde(default)]
    pub timings: TimingConfig,

    /// In-memory task history
    #[serde(default)]
    pub history: HistoryConfig,

    /// AI configuration for the agent
    #[serde(default)]
    pub ai: AIConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chrome_path: Self::default_chrome_path(),
            browser: BrowserSettings::default(),
            search: SearchSettings::default(),
            timings: TimingConfig::default(),
            history: HistoryConfig::default(),
            ai: AIConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get default Chrome path based on platform
    fn default_chrome_path() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            PathBuf::from("C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe")
        }
        #[cfg(target_os = "macos")]
        {
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome")
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            PathBuf::from("/usr/bin/google-chrome")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserSettings {
    /// Run Chrome without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Extra Chrome command line arguments
    #[serde(default)]
    pub custom_args: Vec<String>,

    /// Attempts (500 ms apart) to reach the DevTools endpoint after launch
    #[serde(default = "default_startup_retries")]
    pub startup_retries: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            custom_args: Vec::new(),
            startup_retries: default_startup_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    /// Search engine home page (scheme optional)
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Selector of the query input
    #[serde(default = "default_query_selector")]
    pub query_selector: String,

    /// Result container selectors, tried in order
    #[serde(default = "default_result_selectors")]
    pub result_selectors: Vec<String>,

    /// Number of result containers read from the first matching selector
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            query_selector: default_query_selector(),
            result_selectors: default_result_selectors(),
            result_limit: default_result_limit(),
        }
    }
}

/// Fixed, non-adaptive waits (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// Bounded wait for an element to appear or become interactable
    #[serde(default = "default_element_wait_ms")]
    pub element_wait_ms: u64,

    /// Pause after every navigation
    #[serde(default = "default_navigation_settle_ms")]
    pub navigation_settle_ms: u64,

    /// Pause after submitting a shopping/search query
    #[serde(default = "default_search_settle_ms")]
    pub search_settle_ms: u64,

    /// Pause after submitting a question query
    #[serde(default = "default_question_settle_ms")]
    pub question_settle_ms: u64,
}

impl TimingConfig {
    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn search_settle(&self) -> Duration {
        Duration::from_millis(self.search_settle_ms)
    }

    pub fn question_settle(&self) -> Duration {
        Duration::from_millis(self.question_settle_ms)
    }

    /// All waits set to zero
    pub fn immediate() -> Self {
        Self {
            element_wait_ms: 0,
            navigation_settle_ms: 0,
            search_settle_ms: 0,
            question_settle_ms: 0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            element_wait_ms: default_element_wait_ms(),
            navigation_settle_ms: default_navigation_settle_ms(),
            search_settle_ms: default_search_settle_ms(),
            question_settle_ms: default_question_settle_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Oldest entries are evicted past this size; 0 keeps everything
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_startup_retries() -> u32 {
    30
}

fn default_engine_url() -> String {
    "google.com".to_string()
}

fn default_query_selector() -> String {
    r#"textarea[name="q"], input[name="q"]"#.to_string()
}

fn default_result_selectors() -> Vec<String> {
    [
        "div.g",
        ".tF2Cxc",
        "div[data-async-context]",
        ".ULSxyf",
        ".X7NTVe",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_result_limit() -> usize {
    5
}

fn default_element_wait_ms() -> u64 {
    10_000
}

fn default_navigation_settle_ms() -> u64 {
    2_000
}

fn default_search_settle_ms() -> u64 {
    3_000
}

fn default_question_settle_ms() -> u64 {
    2_000
}

fn default_max_entries() -> usize {
    1000
}

// ==================== AI Configuration ====================

/// API type for the provider
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    Openai,
    Anthropic,
    #[default]
    Ollama,
}

/// AI Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Display name for this provider
    pub name: String,
    /// API type (determines request format)
    #[serde(default)]
    pub api_type: ApiType,
    /// Base URL for the API
    pub base_url: String,
    /// API key (optional for local providers like Ollama)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Available models for this provider
    #[serde(default)]
    pub models: Vec<String>,
}

/// AI configuration for the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AIConfig {
    /// Default LLM model to use (format: "provider_id:model_name")
    #[serde(default = "default_llm")]
    pub default_llm: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// AI providers configuration (key = provider id, value = config)
    #[serde(default = "default_providers")]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_llm() -> Option<String> {
    Some("ollama:qwen2.5:0.5b".to_string())
}

fn default_timeout() -> u64 {
    300
}

fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();
    providers.insert(
        "ollama".to_string(),
        ProviderConfig {
            name: "Ollama".to_string(),
            api_type: ApiType::Ollama,
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            models: vec!["qwen2.5:0.5b".to_string()],
        },
    );
    providers
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            default_llm: default_llm(),
            timeout_seconds: default_timeout(),
            providers: default_providers(),
        }
    }
}
