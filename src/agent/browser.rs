//! Browser control surface.
//!
//! [`BrowserDriver`] is one live automation session with typed errors,
//! [`BrowserLauncher`] opens sessions, and [`BrowserTools`] wraps a session in
//! the tagged `success`/`error` step records the agent logs.

use crate::agent::cdp::{CDPClient, LaunchOptions};
use crate::agent::types::StepRecord;
use crate::config::schema::{BrowserSettings, TimingConfig};
use crate::error::BrowserError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Characters of body text returned by a selector-less `extract_text`
const BODY_PREVIEW_CHARS: usize = 500;

/// One live browser automation session
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    /// Wait until at least one element matches `selector`
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait until the element is present, visible and enabled
    async fn wait_for_interactable(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Clear the element's current value, then insert `text`
    async fn clear_and_type(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    /// Raw text of every element matching `selector`, in document order
    async fn query_texts(&self, selector: &str) -> Result<Vec<String>, BrowserError>;

    async fn body_text(&self) -> Result<String, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Opens new browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, headless: bool) -> Result<Box<dyn BrowserDriver>, BrowserError>;
}

/// Launches a local Chrome per session and drives it over CDP
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    settings: BrowserSettings,
    data_root: PathBuf,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, settings: BrowserSettings) -> Self {
        Self {
            chrome_path,
            settings,
            data_root: std::env::temp_dir().join("webnav-sessions"),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, headless: bool) -> Result<Box<dyn BrowserDriver>, BrowserError> {
        let session_id = Uuid::new_v4().to_string();
        let options = LaunchOptions {
            headless,
            user_data_dir: self.data_root.join(&session_id),
            custom_args: self.settings.custom_args.clone(),
            startup_retries: self.settings.startup_retries.max(1),
        };

        let mut client = CDPClient::new(session_id);
        if let Err(e) = client.launch(&self.chrome_path, &options).await {
            tracing::error!("Failed to launch browser: {}", e);
            let _ = client.close().await;
            return Err(e);
        }
        Ok(Box::new(client))
    }
}

/// Prefix `https://` when the URL has no scheme
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Session-scoped browser surface returning tagged step records.
///
/// Every operation works on the session opened by [`BrowserTools::start`];
/// before that (or after [`BrowserTools::close`]) it reports an error record.
pub struct BrowserTools {
    launcher: Arc<dyn BrowserLauncher>,
    driver: Option<Box<dyn BrowserDriver>>,
    timings: TimingConfig,
}

impl BrowserTools {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, timings: TimingConfig) -> Self {
        Self {
            launcher,
            driver: None,
            timings,
        }
    }

    pub fn is_active(&self) -> bool {
        self.driver.is_some()
    }

    /// The live session, for multi-step flows that need typed errors
    pub fn driver(&self) -> Result<&dyn BrowserDriver, BrowserError> {
        self.driver.as_deref().ok_or(BrowserError::NotStarted)
    }

    pub async fn start(&mut self, headless: bool) -> StepRecord {
        if self.driver.is_some() {
            tracing::warn!("start called with an active session; replacing it");
            self.close().await;
        }

        match self.launcher.launch(headless).await {
            Ok(driver) => {
                self.driver = Some(driver);
                StepRecord::success("start").with_message("Browser started")
            }
            Err(e) => StepRecord::failure("start", e.to_string()),
        }
    }

    pub async fn navigate_to(&self, url: &str) -> StepRecord {
        let url = normalize_url(url);
        match self.try_navigate(&url).await {
            Ok(current) => StepRecord::success("navigate_to").with_url(current),
            Err(e) => StepRecord::failure("navigate_to", e.to_string()),
        }
    }

    async fn try_navigate(&self, url: &str) -> Result<String, BrowserError> {
        let driver = self.driver()?;
        driver.navigate(url).await?;
        tokio::time::sleep(self.timings.navigation_settle()).await;
        driver.current_url().await
    }

    pub async fn click_element(&self, selector: &str) -> StepRecord {
        let result = async {
            let driver = self.driver()?;
            driver
                .wait_for_interactable(selector, self.timings.element_wait())
                .await?;
            driver.click(selector).await
        }
        .await;

        match result {
            Ok(()) => StepRecord::success("click_element"),
            Err(e) => StepRecord::failure("click_element", e.to_string()),
        }
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> StepRecord {
        let result = async {
            let driver = self.driver()?;
            driver
                .wait_for_element(selector, self.timings.element_wait())
                .await?;
            driver.clear_and_type(selector, text).await
        }
        .await;

        match result {
            Ok(()) => StepRecord::success("type_text"),
            Err(e) => StepRecord::failure("type_text", e.to_string()),
        }
    }

    /// Texts of all matches for `selector`, or the page title plus the start of the body text
    pub async fn extract_text(&self, selector: Option<&str>) -> StepRecord {
        match self.try_extract(selector).await {
            Ok(data) => StepRecord::success("extract_text").with_data(data),
            Err(e) => StepRecord::failure("extract_text", e.to_string()),
        }
    }

    async fn try_extract(&self, selector: Option<&str>) -> Result<Vec<String>, BrowserError> {
        let driver = self.driver()?;
        match selector {
            Some(selector) => Ok(driver
                .query_texts(selector)
                .await?
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()),
            None => {
                let title = driver.title().await?;
                let body: String = driver
                    .body_text()
                    .await?
                    .chars()
                    .take(BODY_PREVIEW_CHARS)
                    .collect();
                Ok(vec![format!("Title: {}", title), format!("Content: {}", body)])
            }
        }
    }

    pub async fn get_page_title(&self) -> StepRecord {
        let result = async { self.driver()?.title().await }.await;
        match result {
            Ok(title) => StepRecord::success("get_page_title").with_data(vec![title]),
            Err(e) => StepRecord::failure("get_page_title", e.to_string()),
        }
    }

    /// Release the session; no-op when none is active
    pub async fn close(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::StepStatus;

    struct FailingLauncher;

    #[async_trait]
    impl BrowserLauncher for FailingLauncher {
        async fn launch(&self, _headless: bool) -> Result<Box<dyn BrowserDriver>, BrowserError> {
            Err(BrowserError::Launch("no chrome".to_string()))
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url(" https://a.org/x "), "https://a.org/x");
    }

    #[tokio::test]
    async fn test_operations_before_start_report_errors() {
        let tools = BrowserTools::new(Arc::new(FailingLauncher), TimingConfig::immediate());

        let nav = tools.navigate_to("example.com").await;
        assert_eq!(nav.status, StepStatus::Error);
        assert_eq!(nav.message.as_deref(), Some("Browser session is not active"));

        assert!(!tools.click_element("#go").await.is_success());
        assert!(!tools.type_text("#q", "hi").await.is_success());
        assert!(!tools.extract_text(None).await.is_success());
        assert!(!tools.get_page_title().await.is_success());
    }

    #[tokio::test]
    async fn test_failed_start_leaves_tools_inactive() {
        let mut tools = BrowserTools::new(Arc::new(FailingLauncher), TimingConfig::immediate());
        let record = tools.start(true).await;
        assert_eq!(record.status, StepStatus::Error);
        assert!(record.message.unwrap().contains("no chrome"));
        assert!(!tools.is_active());

        // Closing without a session is harmless
        tools.close().await;
    }
}
