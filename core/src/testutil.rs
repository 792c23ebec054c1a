use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{API_KEY_VAR, DATABASE_ID_VAR};
use crate::notion::{DatabaseQuery, NotionError, Page, QueryRequest, QueryResponse};

/// In-memory `DatabaseQuery` that returns canned pages or a canned error
/// and remembers how it was called.
pub struct StubSource {
    outcome: Result<QueryResponse, String>,
    calls: AtomicUsize,
    last: Mutex<Option<(String, QueryRequest)>>,
}

impl StubSource {
    pub fn pages(pages: Vec<Value>) -> Self {
        let results = pages
            .into_iter()
            .map(|page| serde_json::from_value::<Page>(page).expect("fixture page must decode"))
            .collect();
        Self::with_outcome(Ok(QueryResponse {
            results,
            has_more: false,
            next_cursor: None,
        }))
    }

    /// Fails every query with a Notion API error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_outcome(Err(message.to_string()))
    }

    pub fn with_more(mut self, next_cursor: &str) -> Self {
        if let Ok(response) = &mut self.outcome {
            response.has_more = true;
            response.next_cursor = Some(next_cursor.to_string());
        }
        self
    }

    fn with_outcome(outcome: Result<QueryResponse, String>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, QueryRequest)> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseQuery for StubSource {
    async fn query_database(&self, api_key: &str, query: &QueryRequest) -> Result<QueryResponse, NotionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((api_key.to_string(), query.clone()));

        match &self.outcome {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(NotionError::Api {
                status: 429,
                code: "rate_limited".to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// A page shaped the way Notion returns a horoscope row: `day` as a
/// select, `date_range` as rich text and `horoscope` split into segments.
pub fn horoscope_page(day: &str, date_range: &str, segments: &[&str]) -> Value {
    let segments: Vec<Value> = segments
        .iter()
        .map(|text| json!({ "type": "text", "text": { "content": text }, "plain_text": text }))
        .collect();

    json!({
        "object": "page",
        "id": format!("page-{day}"),
        "properties": {
            "day": { "id": "d", "type": "select", "select": { "id": "s", "name": day, "color": "default" } },
            "date_range": { "id": "r", "type": "rich_text", "rich_text": [{ "type": "text", "plain_text": date_range }] },
            "horoscope": { "id": "h", "type": "rich_text", "rich_text": segments }
        }
    })
}

pub fn env_with(api_key: Option<&str>, database_id: Option<&str>) -> HashMap<String, String> {
    [(API_KEY_VAR, api_key), (DATABASE_ID_VAR, database_id)]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v.to_string())))
        .collect()
}

pub fn configured_env() -> HashMap<String, String> {
    env_with(Some("secret_test"), Some("db-test"))
}
