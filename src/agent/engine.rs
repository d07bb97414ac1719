use crate::agent::browser::{BrowserLauncher, BrowserTools};
use crate::agent::classifier::{classify, extract_target_domain, question_topic, search_terms};
use crate::agent::llm::LLMProvider;
use crate::agent::types::{ExecutionResult, Intent, LLMMessage, StepRecord};
use crate::config::schema::{AppConfig, SearchSettings, TimingConfig};
use crate::error::BrowserError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Snippets fed to the shopping summary prompt
const SUMMARY_CONTEXT_RESULTS: usize = 5;

/// Raw snippets listed under the AI summary
const SUMMARY_RAW_RESULTS: usize = 3;

/// Snippets fed to the question answer prompt
const ANSWER_CONTEXT_RESULTS: usize = 3;

/// Characters kept per result snippet
const SNIPPET_CHARS: usize = 200;

/// Shortest trimmed text (exclusive) that counts as a result
const MIN_SNIPPET_CHARS: usize = 10;

/// Body lines scanned when no result container matched
const BODY_SCAN_LINES: usize = 10;

const BODY_MARKERS: &[&str] = &["price", "₹", "$", "€", "£", "buy", "rating", "review"];

const SHOPPING_SYSTEM_PROMPT: &str = "You are a helpful shopping assistant. Format search results into a clean, useful summary for the user. Focus on products, prices, and key details.";

const ANSWER_SYSTEM_PROMPT: &str = "Answer questions helpfully based on the context provided.";

const NO_DETAILS: &str = "Could not extract detailed results, but search was performed";
const NO_RESULTS: &str = "Search completed - check browser for results";

/// Knobs the executor reads from the config file
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub headless: bool,
    pub timings: TimingConfig,
    pub search: SearchSettings,
}

impl ExecutorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            headless: config.browser.headless,
            timings: config.timings.clone(),
            search: config.search.clone(),
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Runs one request end to end: session, classification, handler, close.
pub struct TaskExecutor {
    launcher: Arc<dyn BrowserLauncher>,
    llm: Arc<dyn LLMProvider>,
    settings: ExecutorSettings,
}

impl TaskExecutor {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        llm: Arc<dyn LLMProvider>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            launcher,
            llm,
            settings,
        }
    }

    pub fn llm(&self) -> Arc<dyn LLMProvider> {
        Arc::clone(&self.llm)
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Execute a request in a fresh browser session.
    ///
    /// The session is closed before returning, whatever the handler did.
    /// A panicking handler becomes an error result.
    pub async fn execute_task(&self, user_input: &str) -> ExecutionResult {
        let mut tools = BrowserTools::new(Arc::clone(&self.launcher), self.settings.timings.clone());

        let start = tools.start(self.settings.headless).await;
        if !start.is_success() {
            tracing::error!(
                "Browser start failed: {}",
                start.message.as_deref().unwrap_or("unknown error")
            );
            return ExecutionResult::error("Failed to start browser");
        }

        let intent = classify(user_input);
        tracing::info!("Task classified as: {}", intent);

        let dispatch = async {
            match intent {
                Intent::Shopping => self.handle_shopping(&tools, user_input).await,
                Intent::Search => self.handle_shopping(&tools, &search_terms(user_input)).await,
                Intent::General => self.handle_shopping(&tools, user_input).await,
                Intent::Navigation => self.handle_navigation(&tools, user_input).await,
                Intent::Question => self.handle_question(&tools, user_input).await,
            }
        };
        let result = match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Handler for {} panicked: {}", intent, message);
                ExecutionResult::error(message)
            }
        };

        tools.close().await;
        tracing::info!("Task finished with status {}", result.status.as_str());
        result
    }

    async fn handle_shopping(&self, tools: &BrowserTools, query: &str) -> ExecutionResult {
        tracing::info!("Performing shopping search for '{}'", query);

        let nav = tools.navigate_to(&self.settings.search.engine_url).await;
        if !nav.is_success() {
            return ExecutionResult::error("Could not access Google");
        }

        match self
            .submit_search(tools, query, self.settings.timings.search_settle())
            .await
        {
            Ok(()) => {
                let results = self.extract_search_results(tools).await;
                let formatted = self.format_shopping_results(query, &results).await;
                ExecutionResult::completed(
                    formatted,
                    vec![nav, StepRecord::success("search_performed")],
                )
            }
            Err(e) => {
                tracing::warn!("Search flow failed, using page fallback: {}", e);
                let extraction = tools.extract_text(None).await;
                ExecutionResult::completed(
                    vec![
                        format!("Search performed for: {}", query),
                        "Found Google search results".to_string(),
                    ],
                    vec![nav, extraction],
                )
            }
        }
    }

    async fn handle_navigation(&self, tools: &BrowserTools, user_input: &str) -> ExecutionResult {
        let Some(domain) = extract_target_domain(user_input) else {
            return ExecutionResult::error("Could not find URL to navigate to");
        };

        tracing::info!("Navigating to {}", domain);
        let nav = tools.navigate_to(&domain).await;
        if !nav.is_success() {
            return ExecutionResult::error("Could not find URL to navigate to");
        }

        let title = tools.get_page_title().await;
        ExecutionResult::completed(title.data_or_empty(), vec![nav, title])
    }

    async fn handle_question(&self, tools: &BrowserTools, user_input: &str) -> ExecutionResult {
        let topic = question_topic(user_input);
        tracing::info!("Searching for: {}", topic);

        let nav = tools.navigate_to(&self.settings.search.engine_url).await;
        if !nav.is_success() {
            return ExecutionResult::error("Could not access search engine");
        }

        match self
            .submit_search(tools, &topic, self.settings.timings.question_settle())
            .await
        {
            Ok(()) => {
                let results = self.extract_search_results(tools).await;
                let answer = self.generate_answer(user_input, &results).await;
                ExecutionResult::completed(
                    vec![format!("Answer: {}", answer)],
                    vec![nav, StepRecord::success("search_performed")],
                )
            }
            Err(e) => {
                tracing::warn!("Question search failed, answering from page text: {}", e);
                let extraction = tools.extract_text(None).await;
                let answer = self
                    .generate_answer(user_input, &extraction.data_or_empty())
                    .await;
                ExecutionResult::completed(vec![format!("Answer: {}", answer)], vec![nav, extraction])
            }
        }
    }

    /// Type the query into the search box, submit, then wait for results
    async fn submit_search(
        &self,
        tools: &BrowserTools,
        query: &str,
        settle: Duration,
    ) -> Result<(), BrowserError> {
        let driver = tools.driver()?;
        let selector = &self.settings.search.query_selector;

        driver
            .wait_for_element(selector, self.settings.timings.element_wait())
            .await?;
        driver.clear_and_type(selector, query).await?;
        driver.press_key("Enter").await?;

        tokio::time::sleep(settle).await;
        Ok(())
    }

    async fn extract_search_results(&self, tools: &BrowserTools) -> Vec<String> {
        match self.collect_snippets(tools).await {
            Ok(results) if results.is_empty() => vec![NO_RESULTS.to_string()],
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Result extraction failed: {}", e);
                vec![NO_DETAILS.to_string()]
            }
        }
    }

    async fn collect_snippets(&self, tools: &BrowserTools) -> Result<Vec<String>, BrowserError> {
        let driver = tools.driver()?;
        let mut results = Vec::new();

        for selector in &self.settings.search.result_selectors {
            let texts = driver.query_texts(selector).await?;
            if texts.is_empty() {
                continue;
            }

            tracing::debug!("Selector '{}' matched {} elements", selector, texts.len());
            for (i, text) in texts.iter().take(self.settings.search.result_limit).enumerate() {
                let text = text.trim();
                if text.chars().count() > MIN_SNIPPET_CHARS {
                    results.push(format!("Result {}: {}...", i + 1, truncate(text, SNIPPET_CHARS)));
                }
            }
            break;
        }

        if results.is_empty() {
            let body = driver.body_text().await?;
            results.extend(
                body.lines()
                    .take(BODY_SCAN_LINES)
                    .filter(|line| {
                        let lower = line.to_lowercase();
                        BODY_MARKERS.iter().any(|m| lower.contains(m))
                    })
                    .map(|line| line.trim().to_string()),
            );
        }

        Ok(results)
    }

    async fn format_shopping_results(&self, query: &str, raw_results: &[String]) -> Vec<String> {
        let header = format!("Shopping Search Results for: {}", query);
        let context = raw_results
            .iter()
            .take(SUMMARY_CONTEXT_RESULTS)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        let messages = [
            LLMMessage::system(SHOPPING_SYSTEM_PROMPT),
            LLMMessage::user(format!(
                "User searched for: '{}'\n\nSearch results found:\n{}\n\nPlease format this into a helpful shopping summary:",
                query, context
            )),
        ];

        match self.llm.generate(&messages).await {
            Ok(summary) => {
                let mut formatted = vec![
                    header,
                    format!("AI Summary: {}", summary),
                    "Raw Results:".to_string(),
                ];
                formatted.extend(raw_results.iter().take(SUMMARY_RAW_RESULTS).cloned());
                formatted
            }
            Err(e) => {
                tracing::warn!("Summary generation failed: {}", e);
                let mut formatted = vec![header];
                formatted.extend(raw_results.iter().take(SUMMARY_CONTEXT_RESULTS).cloned());
                formatted
            }
        }
    }

    async fn generate_answer(&self, question: &str, web_data: &[String]) -> String {
        let context = if web_data.is_empty() {
            "Search results".to_string()
        } else {
            web_data
                .iter()
                .take(ANSWER_CONTEXT_RESULTS)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        };

        let messages = [
            LLMMessage::system(ANSWER_SYSTEM_PROMPT),
            LLMMessage::user(format!("Question: {}\nContext: {}\nAnswer:", question, context)),
        ];

        match self.llm.generate(&messages).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Answer generation failed: {}", e);
                format!("I found information about: {}", question_topic(question))
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("Unexpected error: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Unexpected error: {}", message)
    } else {
        "Unexpected error".to_string()
    }
}
