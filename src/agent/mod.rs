//! Task agent: intent classification, browser control over CDP and LLM-backed handlers.

pub mod browser;
pub mod cdp;
pub mod classifier;
pub mod engine;
pub mod llm;
pub mod types;

pub use browser::{BrowserDriver, BrowserLauncher, BrowserTools, ChromeLauncher};
pub use cdp::CDPClient;
pub use engine::{ExecutorSettings, TaskExecutor};
pub use llm::{LLMClient, LLMProvider};
pub use types::*;
