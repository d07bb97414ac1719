use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebNavError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub type Result<T> = std::result::Result<T, WebNavError>;

/// Failures of a single browser session, one variant per failure mode so the
/// handlers can pick a fallback deliberately.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser session is not active")]
    NotStarted,

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for element: {0}")]
    Timeout(String),

    #[error("CDP protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("{0} API key required")]
    MissingApiKey(String),
}
