//! HTTP category fetcher for MacCMS-style listing APIs.
//!
//! A GET on the source's base URL returns an object whose `class` array
//! lists the categories:
//!
//! ```json
//! {"class": [{"type_id": 1, "type_name": "电影", "type_pid": 0}]}
//! ```
//!
//! `type_pid` is logged but the result is always a flat list.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::CategoryFetcher;
use crate::domain::SourceType;
use crate::error::{MappingError, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Request settings for [`HttpCategoryFetcher`]
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Fetches the `class` list over HTTP
pub struct HttpCategoryFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl HttpCategoryFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| MappingError::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }
}

#[async_trait]
impl CategoryFetcher for HttpCategoryFetcher {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(timeout = ?self.settings.timeout))]
    async fn fetch_categories(&self, source_code: &str, base_url: &str) -> Result<Vec<SourceType>> {
        let url = base_url.trim_end_matches('/');
        debug!(url, "Requesting category list");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header(reqwest::header::ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| MappingError::fetch(source_code, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MappingError::fetch(source_code, format!("HTTP status {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MappingError::fetch(source_code, format!("invalid JSON body: {}", e)))?;

        let types = parse_class_list(&body).map_err(|reason| MappingError::fetch(source_code, reason))?;

        info!(source = source_code, count = types.len(), "Discovered source categories");
        Ok(types)
    }
}

/// Extract categories from a listing response body
///
/// Records with a non-positive id or an empty name are dropped, and repeated
/// ids keep their first occurrence. An empty result is an error.
pub fn parse_class_list(body: &Value) -> std::result::Result<Vec<SourceType>, String> {
    let Some(object) = body.as_object() else {
        return Err("response is not a JSON object".to_string());
    };

    let Some(class) = object.get("class").and_then(Value::as_array) else {
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        return Err(format!("no `class` list in response (keys: {})", keys.join(", ")));
    };

    let mut seen = HashSet::new();
    let mut types = Vec::with_capacity(class.len());

    for record in class {
        let id = int_field(record, "type_id");
        let name = record
            .get("type_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        if id <= 0 || name.is_empty() {
            continue;
        }

        if !seen.insert(id) {
            warn!(type_id = id, type_name = name, "Duplicate category id in response, keeping first");
            continue;
        }

        let parent = int_field(record, "type_pid");
        if parent > 0 {
            debug!(type_id = id, type_name = name, parent_id = parent, "Category has parent");
        }

        types.push(SourceType::new(id, name));
    }

    if types.is_empty() {
        return Err("response contained no usable categories".to_string());
    }

    Ok(types)
}

/// Integers arrive as numbers, floats or numeric strings depending on the source
fn int_field(record: &Value, key: &str) -> i64 {
    match record.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
