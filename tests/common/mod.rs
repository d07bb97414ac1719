// Scripted browser and LLM doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use webnav_lib::agent::browser::{BrowserDriver, BrowserLauncher};
use webnav_lib::agent::engine::{ExecutorSettings, TaskExecutor};
use webnav_lib::agent::llm::LLMProvider;
use webnav_lib::agent::types::{LLMMessage, LLMResponse};
use webnav_lib::config::TimingConfig;
use webnav_lib::{BrowserError, LlmError};

/// What the fake page looks like
#[derive(Clone, Default)]
pub struct PageScript {
    pub title: String,
    pub body: String,
    /// Texts returned per selector; unknown selectors match nothing
    pub selector_texts: HashMap<String, Vec<String>>,
    /// Selectors that never appear
    pub missing: Vec<String>,
    pub fail_navigation: bool,
    pub fail_query: bool,
    /// `query_texts` panics instead of answering
    pub panic_query: bool,
}

impl PageScript {
    pub fn with_results(mut self, selector: &str, texts: &[&str]) -> Self {
        self.selector_texts.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self
    }
}

/// Everything the fake browser saw
#[derive(Default)]
pub struct BrowserLog {
    pub launches: usize,
    pub closes: usize,
    pub navigations: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub keys: Vec<String>,
}

pub struct MockDriver {
    script: PageScript,
    log: Arc<Mutex<BrowserLog>>,
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.log.lock().navigations.push(url.to_string());
        if self.script.fail_navigation {
            return Err(BrowserError::Navigation(format!("{}: net::ERR_NAME_NOT_RESOLVED", url)));
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.log.lock().navigations.last().cloned().unwrap_or_default())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.script.title.clone())
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<(), BrowserError> {
        if self.script.missing.iter().any(|m| m == selector) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn wait_for_interactable(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.wait_for_element(selector, timeout).await
    }

    async fn click(&self, _selector: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn clear_and_type(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        self.log
            .lock()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.log.lock().keys.push(key.to_string());
        Ok(())
    }

    async fn query_texts(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        if self.script.panic_query {
            panic!("result node detached");
        }
        if self.script.fail_query {
            return Err(BrowserError::Protocol("target closed".to_string()));
        }
        Ok(self
            .script
            .selector_texts
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        Ok(self.script.body.clone())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.log.lock().closes += 1;
        Ok(())
    }
}

pub struct MockLauncher {
    pub script: PageScript,
    pub log: Arc<Mutex<BrowserLog>>,
    pub fail: bool,
}

impl MockLauncher {
    pub fn new(script: PageScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            log: Arc::new(Mutex::new(BrowserLog::default())),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: PageScript::default(),
            log: Arc::new(Mutex::new(BrowserLog::default())),
            fail: true,
        })
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, _headless: bool) -> Result<Box<dyn BrowserDriver>, BrowserError> {
        self.log.lock().launches += 1;
        if self.fail {
            return Err(BrowserError::Launch("chrome not found".to_string()));
        }
        Ok(Box::new(MockDriver {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

/// Replies with a fixed text, or fails every call when `reply` is None
pub struct MockLlm {
    pub reply: Option<String>,
    pub calls: Mutex<Vec<Vec<LLMMessage>>>,
}

impl MockLlm {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.calls
            .lock()
            .last()
            .and_then(|messages| messages.iter().find(|m| m.role == "user"))
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl LLMProvider for MockLlm {
    async fn complete(&self, messages: &[LLMMessage]) -> Result<LLMResponse, LlmError> {
        self.calls.lock().push(messages.to_vec());
        match &self.reply {
            Some(text) => Ok(LLMResponse {
                content: text.clone(),
                model: "mock".to_string(),
                usage: Default::default(),
            }),
            None => Err(LlmError::Api {
                provider: "Mock".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}

pub fn executor(launcher: Arc<MockLauncher>, llm: Arc<MockLlm>) -> TaskExecutor {
    let settings = ExecutorSettings {
        timings: TimingConfig::immediate(),
        ..ExecutorSettings::default()
    };
    TaskExecutor::new(launcher, llm, settings)
}
