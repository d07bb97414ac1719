use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::config::schema::{AIConfig, ApiType, ProviderConfig};

/// Classified category of a user request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Shopping,
    Navigation,
    Question,
    Search,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Shopping => "shopping",
            Intent::Navigation => "navigation",
            Intent::Question => "question",
            Intent::Search => "search",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

/// Status of a single browser step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// Tagged outcome of one browser or agent step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub status: StepStatus,
    /// Step name, e.g. "navigate_to", "search_performed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// URL after navigation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extracted text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepRecord {
    pub fn success(action: &str) -> Self {
        Self {
            status: StepStatus::Success,
            action: Some(action.to_string()),
            url: None,
            data: None,
            message: None,
        }
    }

    pub fn failure(action: &str, message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Error,
            action: Some(action.to_string()),
            url: None,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_data(mut self, data: Vec<String>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// Extracted data, or an empty list for failed steps
    pub fn data_or_empty(&self) -> Vec<String> {
        self.data.clone().unwrap_or_default()
    }
}

/// Result of one task execution.
///
/// Build it through [`ExecutionResult::completed`] or [`ExecutionResult::error`]
/// so that an error always carries a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub status: TaskStatus,
    #[serde(default)]
    pub extracted_data: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub execution_log: Vec<StepRecord>,
    /// Elapsed seconds, filled in by the outer wrapper
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl ExecutionResult {
    pub fn completed(extracted_data: Vec<String>, execution_log: Vec<StepRecord>) -> Self {
        Self {
            status: TaskStatus::Completed,
            extracted_data,
            message: None,
            execution_log,
            execution_time: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Error,
            extracted_data: Vec::new(),
            message: Some(message.into()),
            execution_log: Vec::new(),
            execution_time: None,
        }
    }
}

/// LLM message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Browser action suggested by the task planner prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    NavigateTo { url: String },
    ClickElement { selector: String },
    TypeText { selector: String, text: String },
    ExtractText {
        #[serde(default)]
        selector: Option<String>,
    },
}
