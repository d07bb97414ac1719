//! Multi-request behaviours composed from a [`TaskRunner`].

use crate::agent::llm::LLMProvider;
use crate::agent::types::{ExecutionResult, LLMMessage, TaskStatus};
use crate::navigator::TaskRunner;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const REPORT_SYSTEM_PROMPT: &str = "Create a brief, professional summary of web automation results.";

/// Sites searched when none are given
pub const DEFAULT_SEARCH_SITES: &[&str] = &["google.com", "wikipedia.org"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSnapshot {
    pub status: TaskStatus,
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskReport {
    pub task: String,
    /// Local time, "%Y-%m-%d %H:%M:%S"
    pub timestamp: String,
    pub status: TaskStatus,
    pub summary: String,
    pub raw_data: Vec<String>,
}

/// Search `query` on each site, one request per site
pub async fn smart_search(
    runner: &dyn TaskRunner,
    query: &str,
    sites: &[String],
) -> BTreeMap<String, Vec<String>> {
    let mut results = BTreeMap::new();
    for site in sites {
        tracing::info!("Searching {}", site);
        let result = runner
            .process_request(&format!("Go to {} and search for {}", site, query))
            .await;
        results.insert(site.clone(), result.extracted_data);
    }
    results
}

/// Open each site and keep the status and extracted data
pub async fn website_comparison(
    runner: &dyn TaskRunner,
    sites: &[String],
) -> BTreeMap<String, SiteSnapshot> {
    let mut comparison = BTreeMap::new();
    for site in sites {
        tracing::info!("Analyzing {}", site);
        let result = runner
            .process_request(&format!("Go to {} and extract page information", site))
            .await;
        comparison.insert(
            site.clone(),
            SiteSnapshot {
                status: result.status,
                data: result.extracted_data,
            },
        );
    }
    comparison
}

/// Summarize a finished task with the LLM; falls back to a fixed template
pub async fn generate_report(
    llm: &dyn LLMProvider,
    task: &str,
    result: &ExecutionResult,
) -> TaskReport {
    let serialized = serde_json::to_string(result).unwrap_or_default();
    let messages = [
        LLMMessage::system(REPORT_SYSTEM_PROMPT),
        LLMMessage::user(format!("Summarize this web automation result: {}", serialized)),
    ];

    let summary = match llm.generate(&messages).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("Report summary failed: {}", e);
            format!(
                "Task '{}' finished with status {} and {} extracted item(s).",
                task,
                result.status.as_str(),
                result.extracted_data.len()
            )
        }
    };

    TaskReport {
        task: task.to_string(),
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        status: result.status,
        summary,
        raw_data: result.extracted_data.clone(),
    }
}
