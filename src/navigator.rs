use crate::agent::browser::{BrowserLauncher, ChromeLauncher};
use crate::agent::engine::{panic_message, ExecutorSettings, TaskExecutor};
use crate::agent::llm::{LLMClient, LLMProvider};
use crate::agent::types::ExecutionResult;
use crate::config::schema::AppConfig;
use crate::config::validation::validate_search;
use crate::error::Result;
use crate::history::{HistoryEntry, HistoryStore};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Anything that turns a free-text request into an [`ExecutionResult`]
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn process_request(&self, user_input: &str) -> ExecutionResult;
}

/// Entry point for callers: executes requests and keeps their history.
pub struct WebNavigator {
    executor: TaskExecutor,
    history: HistoryStore,
}

impl WebNavigator {
    pub fn new(executor: TaskExecutor, history: HistoryStore) -> Self {
        Self { executor, history }
    }

    /// Chrome launcher and default LLM as configured
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        validate_search(&config.search)?;
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromeLauncher::new(
            config.chrome_path.clone(),
            config.browser.clone(),
        ));
        let llm = LLMClient::new(config.ai.clone()).get_default_llm()?;
        tracing::info!("Using LLM {}:{}", llm.name(), llm.model());

        Ok(Self::new(
            TaskExecutor::new(launcher, llm, ExecutorSettings::from_config(config)),
            HistoryStore::new(config.history.max_entries),
        ))
    }

    pub fn llm(&self) -> Arc<dyn LLMProvider> {
        self.executor.llm()
    }

    /// Run one request, time it and record it; never fails
    pub async fn process_request(&self, user_input: &str) -> ExecutionResult {
        tracing::info!("Processing request: {}", user_input);
        let started = Instant::now();

        let mut result = if user_input.trim().is_empty() {
            ExecutionResult::error("Task request is empty")
        } else {
            AssertUnwindSafe(self.executor.execute_task(user_input))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!("Request failed: {}", message);
                    ExecutionResult::error(message)
                })
        };

        result.execution_time = Some(started.elapsed().as_secs_f64());
        self.history.add(user_input, &result);
        result
    }

    pub fn get_task_history(&self, count: usize) -> Vec<HistoryEntry> {
        self.history.recent(count)
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }
}

#[async_trait]
impl TaskRunner for WebNavigator {
    async fn process_request(&self, user_input: &str) -> ExecutionResult {
        WebNavigator::process_request(self, user_input).await
    }
}
