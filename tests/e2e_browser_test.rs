// End-to-end browser tests against a real Chrome.
// Set WEBNAV_CHROME to the binary; skipped when no Chrome is found.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use webnav_lib::agent::browser::{BrowserLauncher, BrowserTools, ChromeLauncher};
use webnav_lib::config::{AppConfig, TimingConfig};
use webnav_lib::BrowserError;

const PAGE: &str = "data:text/html,<title>Fixture</title>\
    <textarea name=q></textarea>\
    <div class=g>First result with enough text</div>\
    <div class=g>Second result with enough text</div>\
    <button id=off disabled>Off</button>";

fn chrome_path() -> Option<PathBuf> {
    let path = std::env::var_os("WEBNAV_CHROME")
        .map(PathBuf::from)
        .unwrap_or_else(|| AppConfig::default().chrome_path);
    if path.exists() {
        Some(path)
    } else {
        eprintln!("Chrome not found at {:?}, skipping test", path);
        None
    }
}

fn launcher(path: PathBuf) -> ChromeLauncher {
    ChromeLauncher::new(path, AppConfig::default().browser)
}

#[tokio::test]
async fn test_cdp_driver_primitives() {
    let Some(path) = chrome_path() else { return };

    let mut driver = launcher(path).launch(true).await.expect("launch chrome");
    driver.navigate(PAGE).await.unwrap();
    driver
        .wait_for_element("div.g", Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(driver.title().await.unwrap(), "Fixture");
    assert_eq!(
        driver.query_texts("div.g").await.unwrap(),
        vec![
            "First result with enough text".to_string(),
            "Second result with enough text".to_string(),
        ]
    );
    assert!(driver.query_texts(".none").await.unwrap().is_empty());

    driver
        .clear_and_type(r#"textarea[name="q"]"#, "rust crates")
        .await
        .unwrap();
    driver.press_key("Enter").await.unwrap();

    let err = driver
        .wait_for_element("#missing", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::ElementNotFound(_)));

    let err = driver
        .wait_for_interactable("#off", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::Timeout(_)));

    driver.close().await.unwrap();
}

#[tokio::test]
async fn test_browser_tools_session() {
    let Some(path) = chrome_path() else { return };

    let timings = TimingConfig {
        element_wait_ms: 2000,
        navigation_settle_ms: 500,
        ..TimingConfig::immediate()
    };
    let mut tools = BrowserTools::new(Arc::new(launcher(path)), timings);

    assert!(tools.start(true).await.is_success());
    assert!(tools.is_active());

    let driver = tools.driver().unwrap();
    driver.navigate(PAGE).await.unwrap();
    driver
        .wait_for_element("div.g", Duration::from_secs(10))
        .await
        .unwrap();

    let title = tools.get_page_title().await;
    assert_eq!(title.data_or_empty(), vec!["Fixture".to_string()]);

    let page = tools.extract_text(None).await;
    let data = page.data_or_empty();
    assert_eq!(data[0], "Title: Fixture");
    assert!(data[1].starts_with("Content: "));
    assert!(data[1].contains("First result"));

    assert!(!tools.click_element("#off").await.is_success());

    tools.close().await;
    assert!(!tools.is_active());
    assert!(!tools.get_page_title().await.is_success());
}
