use crate::agent::browser::BrowserDriver;
use crate::error::BrowserError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Global port counter for CDP connections (starts at 9222, increments for each new client)
static CDP_PORT_COUNTER: AtomicU16 = AtomicU16::new(9222);

/// Per-command response timeout
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval for element waits
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ports tried before giving up on finding a free one
const MAX_PORT_ATTEMPTS: usize = 100;

fn advance_cdp_port() -> u16 {
    let port = CDP_PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    // Wrap around if we exceed practical port range
    if port > 65500 {
        CDP_PORT_COUNTER.store(9223, Ordering::SeqCst);
        return 9222;
    }
    port
}

/// Nothing listens on `port` locally
fn port_is_free(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Get next CDP port, skipping ones another browser already listens on
fn get_next_cdp_port() -> u16 {
    for _ in 0..MAX_PORT_ATTEMPTS {
        let port = advance_cdp_port();
        if port_is_free(port) {
            return port;
        }
        tracing::debug!("CDP port {} is in use, skipping", port);
    }
    advance_cdp_port()
}

/// Encode a Rust string as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// Chrome launch parameters for one session
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Throw-away profile directory, removed on close
    pub user_data_dir: PathBuf,
    pub custom_args: Vec<String>,
    /// Attempts (500 ms apart) to reach the DevTools endpoint
    pub startup_retries: u32,
}

/// Readiness of an element for waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementState {
    Missing,
    Hidden,
    Disabled,
    Ready,
}

/// CDP Client using raw WebSocket for better Chrome compatibility
pub struct CDPClient {
    /// WebSocket sender
    ws_tx: Option<Arc<Mutex<WsSink>>>,
    /// Response receiver
    responses: Arc<Mutex<HashMap<u32, tokio::sync::oneshot::Sender<serde_json::Value>>>>,
    /// Chrome process
    chrome: Option<Child>,
    /// Session label used in logs
    session_id: String,
    /// Current URL
    current_url: Arc<Mutex<String>>,
    /// Message ID counter
    msg_id: Arc<Mutex<u32>>,
    /// CDP port being used
    cdp_port: u16,
    /// Profile directory to remove on close
    user_data_dir: Option<PathBuf>,
}

impl CDPClient {
    /// Create a new CDP client
    pub fn new(session_id: String) -> Self {
        Self {
            ws_tx: None,
            responses: Arc::new(Mutex::new(HashMap::new())),
            chrome: None,
            session_id,
            current_url: Arc::new(Mutex::new(String::new())),
            msg_id: Arc::new(Mutex::new(1)),
            cdp_port: get_next_cdp_port(),
            user_data_dir: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ws_tx.is_some()
    }

    /// Send a CDP command and wait for response
    async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BrowserError> {
        let tx = self.ws_tx.as_ref().ok_or(BrowserError::NotStarted)?;

        let (id, rx) = {
            let mut msg_id = self.msg_id.lock().await;
            *msg_id += 1;
            let id = *msg_id - 1;

            let (tx, rx) = tokio::sync::oneshot::channel();
            self.responses.lock().await.insert(id, tx);
            (id, rx)
        };

        let command = json!({
            "id": id,
            "method": method,
            "params": params
        });

        let mut tx_guard = tx.lock().await;
        tx_guard
            .send(WsMessage::Text(command.to_string()))
            .await
            .map_err(|e| BrowserError::Protocol(format!("Failed to send {}: {}", method, e)))?;
        drop(tx_guard);

        let response = match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(BrowserError::Protocol("Response channel closed".to_string()))
            }
            Err(_) => {
                self.responses.lock().await.remove(&id);
                return Err(BrowserError::Protocol(format!("Command timeout: {}", method)));
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(BrowserError::Protocol(format!("{}: {}", method, message)));
        }

        Ok(response)
    }

    /// Evaluate a JavaScript expression and return its value
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true
                }),
            )
            .await?;

        if let Some(details) = result.get("result").and_then(|r| r.get("exceptionDetails")) {
            let text = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .or_else(|| details.get("text"))
                .and_then(|t| t.as_str())
                .unwrap_or("script exception");
            return Err(BrowserError::Protocol(text.to_string()));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("result"))
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    /// Launch Chrome with CDP enabled and connect
    pub async fn launch(
        &mut self,
        chrome_path: &Path,
        options: &LaunchOptions,
    ) -> Result<(), BrowserError> {
        std::fs::create_dir_all(&options.user_data_dir).map_err(|e| {
            BrowserError::Launch(format!(
                "Failed to create user data dir {:?}: {}",
                options.user_data_dir, e
            ))
        })?;
        self.user_data_dir = Some(options.user_data_dir.clone());

        // Build Chrome launch command
        let mut cmd = Command::new(chrome_path);
        cmd.arg(format!(
            "--user-data-dir={}",
            options.user_data_dir.display()
        ));
        cmd.arg(format!("--remote-debugging-port={}", self.cdp_port));

        if options.headless {
            cmd.arg("--headless=new");
            cmd.arg("--disable-gpu");
        }

        cmd.arg("--no-sandbox");
        cmd.arg("--disable-dev-shm-usage");
        cmd.arg("--no-first-run");
        cmd.arg("--no-default-browser-check");
        cmd.arg("--disable-background-networking");
        cmd.arg("--disable-sync");

        for arg in &options.custom_args {
            cmd.arg(arg);
        }

        // Start about:blank to avoid loading a page
        cmd.arg("about:blank");
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| BrowserError::Launch(format!("Failed to launch Chrome: {}", e)))?;
        tracing::info!(
            "Chrome started (pid {}, cdp port {}) for session {}",
            child.id(),
            self.cdp_port,
            self.session_id
        );
        self.chrome = Some(child);

        let mut last_error = String::new();
        for attempt in 1..=options.startup_retries {
            tokio::time::sleep(Duration::from_millis(500)).await;

            match self.page_websocket_url().await {
                Ok(ws_url) => match self.connect(&ws_url).await {
                    Ok(()) => return Ok(()),
                    Err(e) => last_error = e.to_string(),
                },
                Err(e) => last_error = e,
            }

            tracing::debug!(
                "Retry {}/{}: {}",
                attempt,
                options.startup_retries,
                last_error
            );
        }

        Err(BrowserError::Launch(format!(
            "Failed to connect to Chrome after {} retries: {}",
            options.startup_retries, last_error
        )))
    }

    /// Find the first page target's debugger URL
    async fn page_websocket_url(&self) -> Result<String, String> {
        let list_url = format!("http://127.0.0.1:{}/json/list", self.cdp_port);

        let response = reqwest::get(&list_url)
            .await
            .map_err(|e| format!("Connection error: {}", e))?;
        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        let targets: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse targets response: {}", e))?;

        let target = targets
            .as_array()
            .and_then(|arr| {
                arr.iter()
                    .find(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
            })
            .ok_or_else(|| "No page target found".to_string())?;

        target
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| "No webSocketDebuggerUrl in page target".to_string())
    }

    /// Open the WebSocket and start routing responses
    async fn connect(&mut self, ws_url: &str) -> Result<(), BrowserError> {
        tracing::info!("Connecting to page target WebSocket: {}", ws_url);

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::Launch(format!("Failed to connect WebSocket: {}", e)))?;
        let (tx, mut rx) = StreamExt::split(ws_stream);
        self.ws_tx = Some(Arc::new(Mutex::new(tx)));

        let responses = self.responses.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) else {
                            continue;
                        };
                        // Events carry no id; only command replies are routed
                        if let Some(id) = json.get("id").and_then(|i| i.as_u64()) {
                            if let Some(sender) = responses.lock().await.remove(&(id as u32)) {
                                let _ = sender.send(json);
                            }
                        }
                        tracing::trace!("WS received: {}", text.chars().take(100).collect::<String>());
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!("WebSocket closed");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("WebSocket error: {:?}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        tracing::info!("CDP client connected for session {}", self.session_id);

        self.send_command("Page.enable", json!({})).await?;
        self.send_command("Runtime.enable", json!({})).await?;
        tracing::debug!("CDP domains enabled");
        Ok(())
    }

    async fn element_state(&self, selector: &str) -> Result<ElementState, BrowserError> {
        let js = format!(
            r#"(function() {{
                const el = document.querySelector({});
                if (!el) return "missing";
                const rect = el.getBoundingClientRect();
                if (rect.width === 0 || rect.height === 0) return "hidden";
                if (el.disabled) return "disabled";
                return "ready";
            }})()"#,
            js_string(selector)
        );

        let state = match self.evaluate(&js).await?.as_str() {
            Some("ready") => ElementState::Ready,
            Some("hidden") => ElementState::Hidden,
            Some("disabled") => ElementState::Disabled,
            _ => ElementState::Missing,
        };
        Ok(state)
    }

    /// Poll until `accept` holds for the element's state or `timeout` elapses
    async fn wait_for_state(
        &self,
        selector: &str,
        timeout: Duration,
        accept: fn(ElementState) -> bool,
    ) -> Result<(), BrowserError> {
        let start = Instant::now();

        loop {
            let state = self.element_state(selector).await?;
            if accept(state) {
                tracing::debug!("Element {:?}: {}", state, selector);
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(match state {
                    ElementState::Missing => BrowserError::ElementNotFound(selector.to_string()),
                    _ => BrowserError::Timeout(selector.to_string()),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn kill_chrome(&mut self) {
        if let Some(mut child) = self.chrome.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(dir) = self.user_data_dir.take() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

#[async_trait]
impl BrowserDriver for CDPClient {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self
            .send_command("Page.navigate", json!({"url": url}))
            .await?;

        if let Some(error_text) = result
            .get("result")
            .and_then(|r| r.get("errorText"))
            .and_then(|e| e.as_str())
        {
            return Err(BrowserError::Navigation(format!("{}: {}", url, error_text)));
        }

        *self.current_url.lock().await = url.to_string();
        tracing::info!("Navigated to: {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        match self.evaluate("window.location.href").await?.as_str() {
            Some(url) => {
                *self.current_url.lock().await = url.to_string();
                Ok(url.to_string())
            }
            // Fallback to stored URL
            None => Ok(self.current_url.lock().await.clone()),
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .evaluate("document.title")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.wait_for_state(selector, timeout, |state| state != ElementState::Missing)
            .await
    }

    async fn wait_for_interactable(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.wait_for_state(selector, timeout, |state| state == ElementState::Ready)
            .await
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let js = format!(
            "(function() {{ const el = document.querySelector({}); if (el) {{ el.click(); return true; }} return false; }})()",
            js_string(selector)
        );

        if self.evaluate(&js).await?.as_bool().unwrap_or(false) {
            tracing::debug!("Clicked element: {}", selector);
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(selector.to_string()))
        }
    }

    async fn clear_and_type(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let js = format!(
            "(function() {{ const el = document.querySelector({}); if (el) {{ el.focus(); el.value = ''; el.dispatchEvent(new Event('input', {{bubbles: true}})); return true; }} return false; }})()",
            js_string(selector)
        );

        if !self.evaluate(&js).await?.as_bool().unwrap_or(false) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }

        self.send_command("Input.insertText", json!({ "text": text }))
            .await?;
        tracing::debug!("Typed '{}' into element: {}", text, selector);
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let (key_code, text) = match key {
            "Enter" => (13, Some("\r")),
            "Tab" => (9, None),
            "Escape" => (27, None),
            "Backspace" => (8, None),
            _ => (key.chars().next().map(|c| c as i32).unwrap_or(0), None),
        };

        let mut key_down = json!({
            "type": "keyDown",
            "key": key,
            "code": key,
            "windowsVirtualKeyCode": key_code
        });
        if let Some(text) = text {
            key_down["text"] = json!(text);
        }
        self.send_command("Input.dispatchKeyEvent", key_down).await?;

        self.send_command(
            "Input.dispatchKeyEvent",
            json!({
                "type": "keyUp",
                "key": key,
                "code": key,
                "windowsVirtualKeyCode": key_code
            }),
        )
        .await?;

        tracing::debug!("Pressed key: {}", key);
        Ok(())
    }

    async fn query_texts(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        let js = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.innerText || el.textContent || '')",
            js_string(selector)
        );

        let value = self.evaluate(&js).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        let value = self
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(tx) = self.ws_tx.take() {
            let mut tx_guard = tx.lock().await;
            let _ = tx_guard.close().await;
        }

        self.kill_chrome();
        tracing::info!("CDP client closed for session {}", self.session_id);
        Ok(())
    }
}

impl Drop for CDPClient {
    fn drop(&mut self) {
        // Ensure Chrome is killed when client is dropped
        self.kill_chrome();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"input[name="q"]"#), r#""input[name=\"q\"]""#);
        assert_eq!(js_string("it's"), r#""it's""#);
    }

    #[test]
    fn test_ports_increment() {
        let a = get_next_cdp_port();
        let b = get_next_cdp_port();
        assert_ne!(a, b);
    }

    #[test]
    fn test_busy_port_is_skipped() {
        let busy = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        assert!(!port_is_free(busy.local_addr().unwrap().port()));

        // hold whatever port the counter hands out next
        let next = CDP_PORT_COUNTER.load(Ordering::SeqCst);
        let _held = std::net::TcpListener::bind(("127.0.0.1", next));

        let port = get_next_cdp_port();
        assert_ne!(port, next);
        assert!(port_is_free(port));
    }

    #[tokio::test]
    async fn test_commands_fail_before_connect() {
        let client = CDPClient::new("test".to_string());
        assert!(!client.is_connected());
        assert_eq!(client.title().await, Err(BrowserError::NotStarted));
        assert_eq!(
            client.navigate("https://example.com").await,
            Err(BrowserError::NotStarted)
        );
    }

    #[tokio::test]
    async fn test_close_without_launch() {
        let mut client = CDPClient::new("test".to_string());
        assert!(client.close().await.is_ok());
    }
}
