pub mod advanced;
pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod navigator;

pub use agent::types::{ExecutionResult, Intent, StepRecord, TaskStatus};
pub use error::{BrowserError, LlmError, Result, WebNavError};
pub use history::{HistoryEntry, HistoryStore};
pub use navigator::{TaskRunner, WebNavigator};
